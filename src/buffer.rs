use crate::errors::{MosaicError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Buffer<T, const ND: usize> {
    // Row-major
    data: Box<[T]>,
    shape: [usize; ND],
}

impl<T: Copy, const ND: usize> Buffer<T, ND> {
    pub fn filled(shape: [usize; ND], value: T) -> Self {
        Self {
            data: vec![value; shape.iter().product()].into_boxed_slice(),
            shape,
        }
    }

    pub fn map<U>(&self, f: impl Fn(T) -> U) -> Buffer<U, ND> {
        Buffer {
            data: self.data.iter().map(|v| f(*v)).collect(),
            shape: self.shape,
        }
    }
}

impl<T> Buffer<T, 3> {
    pub fn from_parts(data: impl Into<Box<[T]>>, shape: [usize; 3]) -> Result<Self> {
        let data = data.into();
        if data.len() != shape.iter().product::<usize>() {
            return Err(MosaicError::ShapeMismatch {
                len: data.len(),
                shape,
            });
        }
        Ok(Self { data, shape })
    }

    /// Row-major samples of one plane.
    pub fn plane(&self, index: usize) -> &[T] {
        let plane_len = self.shape[1] * self.shape[2];
        &self.data[index * plane_len..(index + 1) * plane_len]
    }
}

impl<T, const ND: usize> Buffer<T, ND> {
    pub fn as_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> [usize; ND] {
        self.shape
    }
}

impl<T, const ND: usize> AsRef<[T]> for Buffer<T, ND> {
    fn as_ref(&self) -> &[T] {
        &self.data
    }
}
