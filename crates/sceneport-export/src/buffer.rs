//! Binary buffer writer
//!
//! A single append-only byte arena with a fixed capacity. Every buffer view
//! and accessor of an export is minted here, so byte ranges never overlap
//! and always stay inside the buffer.

use bytemuck::Pod;
use tracing::trace;

use crate::error::{GltfExportError, GltfResult};
use crate::gltf::{
    Accessor, AccessorType, BufferView, Sparse, SparseIndices, SparseValues,
    COMPONENT_TYPE_FLOAT, COMPONENT_TYPE_UNSIGNED_INT, COMPONENT_TYPE_UNSIGNED_SHORT,
    TARGET_ARRAY_BUFFER, TARGET_ELEMENT_ARRAY_BUFFER,
};

#[cfg(not(target_endian = "little"))]
compile_error!("glTF buffers are little-endian; big-endian targets are not supported");

/// Default pre-sized capacity: 50 MiB
pub const DEFAULT_CAPACITY: usize = 50 * 1024 * 1024;

/// Alignment used for vertex and index data
pub const DEFAULT_ALIGNMENT: usize = 4;

/// Intended GPU usage of a buffer view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    /// Images, inverse bind matrices, animation data, sparse storage
    None,
    /// Vertex attributes
    ArrayBuffer,
    /// Triangle indices
    ElementArrayBuffer,
}

impl BufferTarget {
    fn gl(self) -> Option<u32> {
        match self {
            BufferTarget::None => None,
            BufferTarget::ArrayBuffer => Some(TARGET_ARRAY_BUFFER),
            BufferTarget::ElementArrayBuffer => Some(TARGET_ELEMENT_ARRAY_BUFFER),
        }
    }
}

/// A plain element type that can back an accessor
pub trait AccessorElement: Pod {
    const COMPONENT_TYPE: u32;
    const ACCESSOR_TYPE: AccessorType;
}

/// Float elements; these get `min`/`max` bounds
pub trait FloatElement: AccessorElement {
    fn floats(data: &[Self]) -> &[f32] {
        bytemuck::cast_slice(data)
    }
}

macro_rules! accessor_element {
    ($ty:ty, $component:expr, $shape:expr) => {
        impl AccessorElement for $ty {
            const COMPONENT_TYPE: u32 = $component;
            const ACCESSOR_TYPE: AccessorType = $shape;
        }
    };
    ($ty:ty, $component:expr, $shape:expr, float) => {
        accessor_element!($ty, $component, $shape);
        impl FloatElement for $ty {}
    };
}

accessor_element!(f32, COMPONENT_TYPE_FLOAT, AccessorType::Scalar, float);
accessor_element!([f32; 2], COMPONENT_TYPE_FLOAT, AccessorType::Vec2, float);
accessor_element!([f32; 3], COMPONENT_TYPE_FLOAT, AccessorType::Vec3, float);
accessor_element!([f32; 4], COMPONENT_TYPE_FLOAT, AccessorType::Vec4, float);
accessor_element!([f32; 16], COMPONENT_TYPE_FLOAT, AccessorType::Mat4, float);
accessor_element!(u16, COMPONENT_TYPE_UNSIGNED_SHORT, AccessorType::Scalar);
accessor_element!(u32, COMPONENT_TYPE_UNSIGNED_INT, AccessorType::Scalar);
accessor_element!([u16; 4], COMPONENT_TYPE_UNSIGNED_SHORT, AccessorType::Vec4);

/// Per-component bounds of a float run
fn bounds(floats: &[f32], components: usize) -> (Vec<f32>, Vec<f32>) {
    let mut min = vec![f32::MAX; components];
    let mut max = vec![f32::MIN; components];
    for element in floats.chunks_exact(components) {
        for (i, &v) in element.iter().enumerate() {
            min[i] = min[i].min(v);
            max[i] = max[i].max(v);
        }
    }
    (min, max)
}

/// Append-only buffer plus the views and accessors pointing into it
#[derive(Debug)]
pub struct BufferWriter {
    data: Vec<u8>,
    capacity: usize,
    buffer_views: Vec<BufferView>,
    accessors: Vec<Accessor>,
}

impl Default for BufferWriter {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl BufferWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
            buffer_views: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    pub fn buffer_views(&self) -> &[BufferView] {
        &self.buffer_views
    }

    /// Append `bytes` at the next offset aligned to `alignment`, padding with zeros
    pub fn append(&mut self, bytes: &[u8], alignment: usize) -> GltfResult<usize> {
        if bytes.is_empty() {
            return Err(GltfExportError::consistency("attempted to write an empty buffer view"));
        }
        let alignment = alignment.max(1);
        let offset = self.data.len().div_ceil(alignment) * alignment;
        let end = offset + bytes.len();
        if end > self.capacity {
            return Err(GltfExportError::Capacity {
                requested: end,
                capacity: self.capacity,
            });
        }
        self.data.resize(offset, 0);
        self.data.extend_from_slice(bytes);
        Ok(offset)
    }

    /// Append `bytes` and record a buffer view over them
    pub fn push_view(
        &mut self,
        bytes: &[u8],
        alignment: usize,
        target: BufferTarget,
        byte_stride: Option<usize>,
    ) -> GltfResult<usize> {
        let offset = self.append(bytes, alignment)?;
        self.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: Some(offset),
            byte_length: bytes.len(),
            byte_stride,
            target: target.gl(),
        });
        Ok(self.buffer_views.len() - 1)
    }

    fn push_record(&mut self, accessor: Accessor) -> usize {
        trace!(
            accessor = self.accessors.len(),
            count = accessor.count,
            kind = ?accessor.accessor_type,
            "Accessor"
        );
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    /// Write `data` into its own view and mint an accessor over it
    pub fn push_accessor<T: AccessorElement>(
        &mut self,
        data: &[T],
        target: BufferTarget,
    ) -> GltfResult<usize> {
        let view = self.push_view(bytemuck::cast_slice(data), DEFAULT_ALIGNMENT, target, None)?;
        Ok(self.push_record(Accessor {
            buffer_view: Some(view),
            component_type: T::COMPONENT_TYPE,
            count: data.len(),
            accessor_type: T::ACCESSOR_TYPE,
            ..Default::default()
        }))
    }

    /// Like [`push_accessor`](Self::push_accessor), recording `min`/`max`
    pub fn push_accessor_with_bounds<T: FloatElement>(
        &mut self,
        data: &[T],
        target: BufferTarget,
    ) -> GltfResult<usize> {
        let index = self.push_accessor(data, target)?;
        let (min, max) = bounds(T::floats(data), T::ACCESSOR_TYPE.components());
        let accessor = &mut self.accessors[index];
        accessor.min = Some(min);
        accessor.max = Some(max);
        Ok(index)
    }

    /// Accessor of `count` elements that are zero except at `indices`
    ///
    /// `indices` must be strictly increasing and parallel to `values`.
    pub fn push_sparse_accessor<T: FloatElement>(
        &mut self,
        count: usize,
        indices: &[u32],
        values: &[T],
    ) -> GltfResult<usize> {
        if indices.len() != values.len() || indices.is_empty() {
            return Err(GltfExportError::consistency(format!(
                "sparse accessor needs matching non-empty indices and values, got {} and {}",
                indices.len(),
                values.len()
            )));
        }
        let components = T::ACCESSOR_TYPE.components();
        let (mut min, mut max) = bounds(T::floats(values), components);
        if indices.len() < count {
            for i in 0..components {
                min[i] = min[i].min(0.0);
                max[i] = max[i].max(0.0);
            }
        }

        let index_view = self.push_view(bytemuck::cast_slice(indices), DEFAULT_ALIGNMENT, BufferTarget::None, None)?;
        let value_view = self.push_view(bytemuck::cast_slice(values), DEFAULT_ALIGNMENT, BufferTarget::None, None)?;

        Ok(self.push_record(Accessor {
            buffer_view: None,
            component_type: T::COMPONENT_TYPE,
            count,
            accessor_type: T::ACCESSOR_TYPE,
            min: Some(min),
            max: Some(max),
            sparse: Some(Sparse {
                count: indices.len(),
                indices: SparseIndices {
                    buffer_view: index_view,
                    component_type: COMPONENT_TYPE_UNSIGNED_INT,
                },
                values: SparseValues { buffer_view: value_view },
            }),
            ..Default::default()
        }))
    }

    /// Accessor of `count` zero elements with no backing bytes
    pub fn push_zero_accessor<T: FloatElement>(&mut self, count: usize) -> usize {
        let components = T::ACCESSOR_TYPE.components();
        self.push_record(Accessor {
            buffer_view: None,
            component_type: T::COMPONENT_TYPE,
            count,
            accessor_type: T::ACCESSOR_TYPE,
            min: Some(vec![0.0; components]),
            max: Some(vec![0.0; components]),
            ..Default::default()
        })
    }

    /// Reinterpret an accessor written as a flat scalar run
    pub fn reshape_accessor(
        &mut self,
        index: usize,
        accessor_type: AccessorType,
        count: usize,
    ) -> GltfResult<()> {
        let accessor = self
            .accessors
            .get_mut(index)
            .ok_or_else(|| GltfExportError::consistency(format!("no accessor {index} to reshape")))?;
        if accessor.count * accessor.accessor_type.components() != count * accessor_type.components() {
            return Err(GltfExportError::consistency(format!(
                "accessor {index} holds {} components, cannot view as {count} x {accessor_type:?}",
                accessor.count * accessor.accessor_type.components()
            )));
        }
        accessor.accessor_type = accessor_type;
        accessor.count = count;
        accessor.min = None;
        accessor.max = None;
        Ok(())
    }

    /// Hand over the bytes, views and accessors
    pub fn finish(self) -> (Vec<u8>, Vec<BufferView>, Vec<Accessor>) {
        (self.data, self.buffer_views, self.accessors)
    }
}
