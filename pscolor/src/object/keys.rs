//! Dictionary keys and names used by color spaces, functions and shadings.

#![allow(missing_docs)]

macro_rules! key {
    ($i:ident, $e:expr) => {
        pub const $i: &str = $e;
    };
}

// Color space families.
key!(DEVICE_GRAY, "DeviceGray");
key!(DEVICE_RGB, "DeviceRGB");
key!(DEVICE_CMYK, "DeviceCMYK");
key!(CIE_BASED_A, "CIEBasedA");
key!(CIE_BASED_ABC, "CIEBasedABC");
key!(CIE_BASED_DEF, "CIEBasedDEF");
key!(CIE_BASED_DEFG, "CIEBasedDEFG");
key!(ICC_BASED, "ICCBased");
key!(INDEXED, "Indexed");
key!(SEPARATION, "Separation");
key!(DEVICE_N, "DeviceN");
key!(PATTERN, "Pattern");

// Colorant names.
key!(NONE, "None");
key!(ALL, "All");

// CIE-based dictionaries.
key!(RANGE_A, "RangeA");
key!(DECODE_A, "DecodeA");
key!(MATRIX_A, "MatrixA");
key!(RANGE_ABC, "RangeABC");
key!(DECODE_ABC, "DecodeABC");
key!(MATRIX_ABC, "MatrixABC");
key!(RANGE_LMN, "RangeLMN");
key!(DECODE_LMN, "DecodeLMN");
key!(MATRIX_LMN, "MatrixLMN");
key!(WHITE_POINT, "WhitePoint");
key!(BLACK_POINT, "BlackPoint");
key!(RANGE_DEF, "RangeDEF");
key!(DECODE_DEF, "DecodeDEF");
key!(RANGE_HIJ, "RangeHIJ");
key!(RANGE_DEFG, "RangeDEFG");
key!(DECODE_DEFG, "DecodeDEFG");
key!(RANGE_HIJK, "RangeHIJK");
key!(TABLE, "Table");

// ICC profile streams.
key!(N, "N");
key!(ALTERNATE, "Alternate");
key!(RANGE, "Range");

// Functions.
key!(FUNCTION_TYPE, "FunctionType");
key!(DOMAIN, "Domain");
key!(SIZE, "Size");
key!(BITS_PER_SAMPLE, "BitsPerSample");
key!(ORDER, "Order");
key!(ENCODE, "Encode");
key!(DECODE, "Decode");
key!(DATA_SOURCE, "DataSource");
key!(C0, "C0");
key!(C1, "C1");
key!(FUNCTIONS, "Functions");
key!(BOUNDS, "Bounds");

// Shadings.
key!(SHADING_TYPE, "ShadingType");
key!(COLOR_SPACE, "ColorSpace");
key!(BACKGROUND, "Background");
key!(BBOX, "BBox");
key!(ANTI_ALIAS, "AntiAlias");
key!(MATRIX, "Matrix");
key!(FUNCTION, "Function");
key!(COORDS, "Coords");
key!(EXTEND, "Extend");
key!(BITS_PER_COORDINATE, "BitsPerCoordinate");
key!(BITS_PER_COMPONENT, "BitsPerComponent");
key!(BITS_PER_FLAG, "BitsPerFlag");
key!(VERTICES_PER_ROW, "VerticesPerRow");
