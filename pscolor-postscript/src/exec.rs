//! The restricted evaluator.

use std::sync::Arc;

use log::{debug, error};

use crate::error::{Error, Result};
use crate::procedure::Procedure;
use crate::token::{Op, Token};

/// The maximum depth of the operand stack.
pub const MAX_STACK_DEPTH: usize = 500;
/// The maximum nesting of executed procedures.
const MAX_CALL_DEPTH: usize = 64;
/// The maximum number of tokens a single evaluation may execute.
const MAX_OPERATIONS: usize = 1 << 20;

/// A value on the operand stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A number. Integers and reals share one representation.
    Number(f32),
    /// A boolean.
    Bool(bool),
    /// A mark pushed by `[`.
    Mark,
    /// An array built with `[ ... ]`.
    Array(Arc<[Value]>),
    /// A string.
    String(Arc<[u8]>),
    /// A procedure body.
    Procedure(Procedure),
}

impl Default for Value {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

impl Value {
    /// Return the number, or fail with a type check.
    pub fn as_f32(&self) -> Result<f32> {
        match self {
            Self::Number(n) => Ok(*n),
            _ => Err(Error::TypeCheck),
        }
    }

    fn as_i32(&self) -> Result<i32> {
        self.as_f32().map(|n| n as i32)
    }

    fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            // Be lenient and accept numbers as conditions.
            Self::Number(n) => Ok(*n != 0.0),
            _ => Err(Error::TypeCheck),
        }
    }

    /// Convert the value into an output component.
    pub fn to_output(&self) -> f32 {
        match self {
            Self::Number(n) => *n,
            Self::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    fn from_token(token: &Token) -> Result<Self> {
        match token {
            Token::Number(n) => Ok(Self::Number(n.as_f32())),
            Token::String(s) => Ok(Self::String(s.clone())),
            Token::Procedure(p) => Ok(Self::Procedure(p.clone())),
            Token::Operator(Op::True) => Ok(Self::Bool(true)),
            Token::Operator(Op::False) => Ok(Self::Bool(false)),
            _ => Err(Error::TypeCheck),
        }
    }
}

/// The operand stack of the evaluator.
#[derive(Debug, Default, Clone)]
pub struct OperandStack {
    items: Vec<Value>,
}

impl OperandStack {
    /// Create a new, empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of values on the stack.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the stack is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Push a value.
    #[inline]
    pub fn push(&mut self, value: Value) -> Result<()> {
        if self.items.len() == MAX_STACK_DEPTH {
            error!("overflowed postscript operand stack");

            Err(Error::StackOverflow)
        } else {
            self.items.push(value);

            Ok(())
        }
    }

    /// Pop the topmost value.
    #[inline]
    pub fn pop(&mut self) -> Result<Value> {
        self.items.pop().ok_or_else(|| {
            debug!("underflowed postscript operand stack");

            Error::StackUnderflow
        })
    }

    #[inline]
    fn pop_f32(&mut self) -> Result<f32> {
        self.pop()?.as_f32()
    }

    #[inline]
    fn pop_i32(&mut self) -> Result<i32> {
        self.pop()?.as_i32()
    }

    /// Pop a non-negative count operand, like the one of `index` or `copy`.
    #[inline]
    fn pop_count(&mut self) -> Result<usize> {
        let n = self.pop_i32()?;

        usize::try_from(n).map_err(|_| Error::RangeCheck)
    }

    fn pop_procedure(&mut self) -> Result<Procedure> {
        match self.pop()? {
            Value::Procedure(p) => Ok(p),
            _ => Err(Error::TypeCheck),
        }
    }

    /// The topmost value.
    #[inline]
    pub fn last(&self) -> Option<&Value> {
        self.items.last()
    }

    /// All values from bottom to top.
    #[inline]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Remove all values.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Executes procedures against an operand stack.
#[derive(Debug)]
pub struct Interpreter {
    stack: OperandStack,
    operations_left: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Create a new interpreter with an empty stack.
    pub fn new() -> Self {
        Self {
            stack: OperandStack::new(),
            operations_left: MAX_OPERATIONS,
        }
    }

    /// The operand stack.
    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    /// The operand stack, mutably.
    pub fn stack_mut(&mut self) -> &mut OperandStack {
        &mut self.stack
    }

    /// Execute a procedure.
    pub fn execute(&mut self, procedure: &Procedure) -> Result<()> {
        self.execute_inner(procedure.tokens(), 0)
    }

    fn execute_inner(&mut self, tokens: &[Token], depth: usize) -> Result<()> {
        if depth > MAX_CALL_DEPTH {
            return Err(Error::LimitCheck);
        }

        for token in tokens {
            self.operations_left = self
                .operations_left
                .checked_sub(1)
                .ok_or(Error::LimitCheck)?;

            match token {
                Token::Number(n) => self.stack.push(Value::Number(n.as_f32()))?,
                Token::String(s) => self.stack.push(Value::String(s.clone()))?,
                Token::Procedure(p) => self.stack.push(Value::Procedure(p.clone()))?,
                Token::Name { name, literal } => {
                    if !literal {
                        debug!(
                            "ignoring unknown postscript operator {}",
                            String::from_utf8_lossy(name)
                        );
                    }
                }
                Token::Operator(op) => self.execute_op(*op, depth)?,
            }
        }

        Ok(())
    }

    fn execute_op(&mut self, op: Op, depth: usize) -> Result<()> {
        let stack = &mut self.stack;

        macro_rules! one_f {
            ($eval:expr) => {{
                let n1 = stack.pop_f32()?;
                stack.push(Value::Number($eval(n1)?))?;
            }};
        }

        macro_rules! two_f {
            ($eval:expr) => {{
                let n2 = stack.pop_f32()?;
                let n1 = stack.pop_f32()?;
                stack.push(Value::Number($eval(n1, n2)?))?;
            }};
        }

        macro_rules! two_i {
            ($eval:expr) => {{
                let n2 = stack.pop_i32()?;
                let n1 = stack.pop_i32()?;
                let res: Option<i32> = $eval(n1, n2);
                stack.push(Value::Number(res.ok_or(Error::UndefinedResult)? as f32))?;
            }};
        }

        macro_rules! compare {
            ($eval:expr) => {{
                let n2 = stack.pop()?;
                let n1 = stack.pop()?;
                let res = match (&n1, &n2) {
                    (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).is_some_and($eval),
                    (Value::String(a), Value::String(b)) => $eval(a.cmp(b)),
                    _ => return Err(Error::TypeCheck),
                };
                stack.push(Value::Bool(res))?;
            }};
        }

        macro_rules! logical {
            ($eval_i:expr, $eval_b:expr) => {{
                let n2 = stack.pop()?;
                let n1 = stack.pop()?;
                let res = match (n1, n2) {
                    (Value::Bool(b1), Value::Bool(b2)) => Value::Bool($eval_b(b1, b2)),
                    (Value::Number(f1), Value::Number(f2)) => {
                        Value::Number($eval_i(f1 as i32, f2 as i32) as f32)
                    }
                    _ => return Err(Error::TypeCheck),
                };
                stack.push(res)?;
            }};
        }

        fn ok(n: f32) -> Result<f32> {
            Ok(n)
        }

        fn defined(n: f32) -> Result<f32> {
            if n.is_finite() {
                Ok(n)
            } else {
                Err(Error::UndefinedResult)
            }
        }

        match op {
            Op::Dup => {
                let top = stack.last().cloned().ok_or(Error::StackUnderflow)?;
                stack.push(top)?;
            }
            Op::Pop => {
                stack.pop()?;
            }
            Op::Exch => {
                let n2 = stack.pop()?;
                let n1 = stack.pop()?;

                stack.push(n2)?;
                stack.push(n1)?;
            }
            Op::Index => {
                let n = stack.pop_count()?;
                let idx = stack
                    .len()
                    .checked_sub(n + 1)
                    .ok_or(Error::StackUnderflow)?;

                let value = stack.items[idx].clone();
                stack.push(value)?;
            }
            Op::Roll => {
                let j = stack.pop_i32()?;
                let n = stack.pop_count()?;
                let start = stack.len().checked_sub(n).ok_or(Error::StackUnderflow)?;
                let target = &mut stack.items[start..];

                if !target.is_empty() {
                    let shift = j.unsigned_abs() as usize % target.len();

                    if j >= 0 {
                        target.rotate_right(shift);
                    } else {
                        target.rotate_left(shift);
                    }
                }
            }
            Op::Copy => {
                let n = stack.pop_count()?;
                let start = stack.len().checked_sub(n).ok_or(Error::StackUnderflow)?;

                for i in start..start + n {
                    let value = stack.items[i].clone();
                    stack.push(value)?;
                }
            }
            Op::Add => two_f!(|a: f32, b: f32| ok(a + b)),
            Op::Sub => two_f!(|a: f32, b: f32| ok(a - b)),
            Op::Mul => two_f!(|a: f32, b: f32| ok(a * b)),
            Op::Div => two_f!(|a: f32, b: f32| {
                if b == 0.0 {
                    Err(Error::UndefinedResult)
                } else {
                    Ok(a / b)
                }
            }),
            Op::Idiv => two_i!(|a: i32, b: i32| a.checked_div(b)),
            Op::Mod => two_i!(|a: i32, b: i32| a.checked_rem(b)),
            Op::Exp => two_f!(|a: f32, b: f32| defined(a.powf(b))),
            Op::Neg => one_f!(|n: f32| ok(-n)),
            Op::Abs => one_f!(|n: f32| ok(n.abs())),
            Op::Floor => one_f!(|n: f32| ok(n.floor())),
            Op::Ceiling => one_f!(|n: f32| ok(n.ceil())),
            // Halfway values round up, so -6.5 becomes -6.
            Op::Round => one_f!(|n: f32| ok((n + 0.5).floor())),
            Op::Truncate | Op::Cvi => one_f!(|n: f32| ok(n.trunc())),
            Op::Cvr => one_f!(ok),
            Op::Sqrt => one_f!(|n: f32| {
                if n < 0.0 {
                    Err(Error::RangeCheck)
                } else {
                    Ok(n.sqrt())
                }
            }),
            Op::Sin => one_f!(|n: f32| ok(n.to_radians().sin())),
            Op::Cos => one_f!(|n: f32| ok(n.to_radians().cos())),
            Op::Atan => two_f!(|num: f32, den: f32| {
                if num == 0.0 && den == 0.0 {
                    return Err(Error::UndefinedResult);
                }

                let mut res = num.atan2(den).to_degrees() % 360.0;
                if res < 0.0 {
                    res += 360.0;
                }

                Ok(res)
            }),
            Op::Ln => one_f!(|n: f32| {
                if n <= 0.0 {
                    Err(Error::RangeCheck)
                } else {
                    Ok(n.ln())
                }
            }),
            Op::Log => one_f!(|n: f32| {
                if n <= 0.0 {
                    Err(Error::RangeCheck)
                } else {
                    Ok(n.log10())
                }
            }),
            Op::Eq | Op::Ne => {
                let n2 = stack.pop()?;
                let n1 = stack.pop()?;
                let equal = match (&n1, &n2) {
                    (Value::Number(a), Value::Number(b)) => a == b,
                    (Value::Bool(a), Value::Bool(b)) => a == b,
                    (Value::String(a), Value::String(b)) => a == b,
                    (Value::Mark, Value::Mark) => true,
                    (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
                    _ => false,
                };

                stack.push(Value::Bool(if op == Op::Eq { equal } else { !equal }))?;
            }
            Op::Ge => compare!(|o: core::cmp::Ordering| o.is_ge()),
            Op::Gt => compare!(|o: core::cmp::Ordering| o.is_gt()),
            Op::Le => compare!(|o: core::cmp::Ordering| o.is_le()),
            Op::Lt => compare!(|o: core::cmp::Ordering| o.is_lt()),
            Op::Not => {
                let res = match stack.pop()? {
                    Value::Bool(b) => Value::Bool(!b),
                    Value::Number(n) => Value::Number(!(n as i32) as f32),
                    _ => return Err(Error::TypeCheck),
                };

                stack.push(res)?;
            }
            Op::And => logical!(|a: i32, b: i32| a & b, |a: bool, b: bool| a && b),
            Op::Or => logical!(|a: i32, b: i32| a | b, |a: bool, b: bool| a || b),
            Op::Xor => logical!(|a: i32, b: i32| a ^ b, |a: bool, b: bool| a ^ b),
            Op::Bitshift => {
                let shift = stack.pop_i32()?;
                let num = stack.pop_i32()? as u32;
                let res = if shift >= 0 {
                    num.checked_shl(shift as u32).unwrap_or(0)
                } else {
                    num.checked_shr(shift.unsigned_abs()).unwrap_or(0)
                };

                stack.push(Value::Number(res as i32 as f32))?;
            }
            Op::True => stack.push(Value::Bool(true))?,
            Op::False => stack.push(Value::Bool(false))?,
            Op::If => {
                let proc = stack.pop_procedure()?;
                let cond = stack.pop()?.as_bool()?;

                if cond {
                    self.execute_inner(proc.tokens(), depth + 1)?;
                }
            }
            Op::IfElse => {
                let proc2 = stack.pop_procedure()?;
                let proc1 = stack.pop_procedure()?;
                let cond = stack.pop()?.as_bool()?;

                let chosen = if cond { proc1 } else { proc2 };
                self.execute_inner(chosen.tokens(), depth + 1)?;
            }
            Op::Exec => match stack.pop()? {
                Value::Procedure(p) => self.execute_inner(p.tokens(), depth + 1)?,
                // Executing any other object pushes it back.
                other => stack.push(other)?,
            },
            Op::Mark => stack.push(Value::Mark)?,
            Op::ArrayEnd => {
                let mark = stack
                    .items
                    .iter()
                    .rposition(|v| matches!(v, Value::Mark))
                    .ok_or(Error::UnmatchedMark)?;
                let elements: Arc<[Value]> = stack.items.drain(mark..).skip(1).collect();

                stack.push(Value::Array(elements))?;
            }
            Op::Get => {
                let index = stack.pop_i32()?;
                let container = stack.pop()?;
                let index = usize::try_from(index).map_err(|_| Error::RangeCheck)?;

                let value = match container {
                    Value::Array(a) => a.get(index).cloned().ok_or(Error::RangeCheck)?,
                    Value::String(s) => {
                        Value::Number(*s.get(index).ok_or(Error::RangeCheck)? as f32)
                    }
                    Value::Procedure(p) => {
                        Value::from_token(p.tokens().get(index).ok_or(Error::RangeCheck)?)?
                    }
                    _ => return Err(Error::TypeCheck),
                };

                stack.push(value)?;
            }
            Op::Length => {
                let len = match stack.pop()? {
                    Value::Array(a) => a.len(),
                    Value::String(s) => s.len(),
                    Value::Procedure(p) => p.tokens().len(),
                    _ => return Err(Error::TypeCheck),
                };

                stack.push(Value::Number(len as f32))?;
            }
            Op::Bind | Op::Readonly => {}
        }

        Ok(())
    }
}
