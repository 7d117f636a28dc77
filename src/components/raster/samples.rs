use num::traits::AsPrimitive;

use crate::{buffer::Buffer, components::sample::SampleType};

/// Planes stored in the layout of their [SampleType].
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Byte(Buffer<u8, 3>),
    Short(Buffer<i16, 3>),
    Int(Buffer<i32, 3>),
    Float(Buffer<f32, 3>),
    Double(Buffer<f64, 3>),
}

macro_rules! for_each_samples {
    ($samples:expr, $buffer:ident => $body:expr) => {
        match $samples {
            Samples::Byte($buffer) => $body,
            Samples::Short($buffer) => $body,
            Samples::Int($buffer) => $body,
            Samples::Float($buffer) => $body,
            Samples::Double($buffer) => $body,
        }
    };
}

fn to_integer<T>(value: f64, sample_type: SampleType) -> T
where
    T: Copy + 'static,
    f64: AsPrimitive<T>,
{
    let (min, max) = sample_type.range();
    value.round().clamp(min, max).as_()
}

impl Samples {
    /// Cast working values into `sample_type`, rounding and saturating integer types.
    pub fn from_f64(values: &Buffer<f64, 3>, sample_type: SampleType) -> Self {
        match sample_type {
            SampleType::Byte => Samples::Byte(values.map(|v| to_integer(v, sample_type))),
            SampleType::Short => Samples::Short(values.map(|v| to_integer(v, sample_type))),
            SampleType::Int => Samples::Int(values.map(|v| to_integer(v, sample_type))),
            SampleType::Float => Samples::Float(values.map(|v| v as f32)),
            SampleType::Double => Samples::Double(values.clone()),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Samples::Byte(_) => SampleType::Byte,
            Samples::Short(_) => SampleType::Short,
            Samples::Int(_) => SampleType::Int,
            Samples::Float(_) => SampleType::Float,
            Samples::Double(_) => SampleType::Double,
        }
    }

    /// (C, H, W)
    pub fn shape(&self) -> [usize; 3] {
        for_each_samples!(self, buffer => buffer.shape())
    }

    pub fn get(&self, index: usize) -> f64 {
        for_each_samples!(self, buffer => buffer.as_ref()[index].as_())
    }

    pub fn plane_f64(&self, band: usize) -> Vec<f64> {
        for_each_samples!(self, buffer => buffer.plane(band).iter().map(|v| v.as_()).collect())
    }

    pub fn to_f64(&self) -> Buffer<f64, 3> {
        for_each_samples!(self, buffer => buffer.map(|v| v.as_()))
    }
}
