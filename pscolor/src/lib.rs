/*!
The PostScript color model.

This crate resolves PostScript color spaces, functions, sampled images and shadings into
device colors, so that a rendering backend only ever needs to deal with RGB.

Supported are:
- The device color spaces, with conversions between gray, RGB, CMYK and HSB.
- The CIE-based color spaces, including `CIEBasedDEF` and `CIEBasedDEFG` lookup tables.
- `ICCBased` color spaces, with a fallback to the alternate color space if a profile
  can't be used.
- `Indexed`, `Separation`, `DeviceN` and `Pattern` color spaces. Tint transforms
  can be restricted PostScript procedures, functions or procedures run by the caller.
- Functions of type 0, 2, 3 and 4.
- Conversion of sampled images and image masks, including color key and stencil masking.
- All seven shading types. Meshes are parsed into triangles and patches.

Objects are passed in as a small [`Object`] model, which the surrounding interpreter is
expected to build from its own representation.

```
use pscolor::{Color, ColorSpace, Context, Object};

let ctx = Context::default();
let color_space = ColorSpace::new(&Object::name("DeviceCMYK"), &ctx).unwrap();
let color = Color::new(color_space, &[0.0, 1.0, 1.0, 0.0]);

assert_eq!(color.to_rgb(&ctx), [1.0, 0.0, 0.0]);
```

## Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cache;
pub mod color;
pub mod context;
pub mod error;
pub mod function;
pub mod image;
pub mod mesh;
pub mod object;
pub mod settings;
pub mod shading;

pub use cache::Cache;
pub use color::device;
pub use color::{Color, ColorComponents, ColorSpace, ColorSpaceFamily};
pub use context::Context;
pub use error::{Error, Result};
pub use function::{Function, Values};
pub use image::{
    ImageSource, MaskColor, Pixmap, StencilMask, convert_image, convert_image_mask,
};
pub use mesh::{CoonsPatch, MeshTriangle, MeshVertex, Patch, TensorPatch};
pub use object::{Dict, FromObject, Name, Object, Stream, StreamId, TintTransform};
pub use settings::{ColorSettings, ColorWarning, WarningSinkFn};
pub use shading::{ColorStop, Shading, ShadingType};
