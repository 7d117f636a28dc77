use std::fmt::Display;

/// Pixel data types, ordered by promotion.
///
/// Unsigned and narrower native types fold into the smallest variant holding their range,
/// see [SampleType::from_native].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Byte,
    Short,
    Int,
    Float,
    Double,
}

/// Native numeric layouts a source may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl SampleType {
    pub fn promote(self, other: SampleType) -> SampleType {
        self.max(other)
    }

    /// Supremum of all types, `None` when there are none.
    pub fn supremum(types: impl IntoIterator<Item = SampleType>) -> Option<SampleType> {
        types.into_iter().reduce(SampleType::promote)
    }

    pub fn from_native(native: NativeType) -> SampleType {
        match native {
            NativeType::U8 => SampleType::Byte,
            NativeType::I8 | NativeType::I16 => SampleType::Short,
            NativeType::U16 | NativeType::I32 => SampleType::Int,
            NativeType::F32 => SampleType::Float,
            NativeType::U32 | NativeType::U64 | NativeType::I64 | NativeType::F64 => {
                SampleType::Double
            }
        }
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, SampleType::Float | SampleType::Double)
    }

    /// Value range representable by this type.
    pub fn range(&self) -> (f64, f64) {
        match self {
            SampleType::Byte => (u8::MIN as f64, u8::MAX as f64),
            SampleType::Short => (i16::MIN as f64, i16::MAX as f64),
            SampleType::Int => (i32::MIN as f64, i32::MAX as f64),
            SampleType::Float => (f32::MIN as f64, f32::MAX as f64),
            SampleType::Double => (f64::MIN, f64::MAX),
        }
    }

    /// No-data marker of an output band of this type: NaN for floating types, otherwise
    /// the declared value rounded and clamped into the type's range the way samples are
    /// stored, or zero.
    pub fn no_data_marker(&self, declared: Option<f64>) -> f64 {
        if self.is_floating() {
            return f64::NAN;
        }
        let (min, max) = self.range();
        declared
            .filter(|value| !value.is_nan())
            .map(|value| value.round().clamp(min, max))
            .unwrap_or(0.)
    }
}

impl Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SampleType::Byte => "byte",
            SampleType::Short => "short",
            SampleType::Int => "int",
            SampleType::Float => "float",
            SampleType::Double => "double",
        };
        write!(f, "{name}")
    }
}

/// Either infer the output type from the sources or force one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleTypeSelection {
    #[default]
    Auto,
    Forced(SampleType),
}

impl From<SampleType> for SampleTypeSelection {
    fn from(value: SampleType) -> Self {
        SampleTypeSelection::Forced(value)
    }
}
