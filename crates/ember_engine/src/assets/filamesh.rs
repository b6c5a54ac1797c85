//! Reader for the engine's binary mesh container (`.filamesh`)
//!
//! The container stores compact vertex attributes: positions and texture
//! coordinates as half floats, tangent frames as snorm16 quaternions (from
//! which normals are recovered), and 16- or 32-bit indices. Layout:
//!
//! ```text
//! magic            8 bytes, "FILAMESH"
//! version          u32
//! part count       u32
//! aabb             6 x f32 (center, half extent)
//! flags            u32 (interleaved / snorm16 UVs / compressed)
//! attribute table  offset + stride u32 pairs for position, tangents,
//!                  color, uv0, uv1 (offset 0xffffffff marks an absent
//!                  attribute)
//! vertex count     u32
//! vertex blob size u32, followed by the blob
//! index type       u32 (0 = u32, 1 = u16)
//! index count      u32
//! index blob size  u32, followed by the blob
//! parts            per part: offset, index count, min/max index,
//!                  material id, aabb
//! material names   u32 count, then length-prefixed NUL-terminated strings
//! ```
//!
//! All integers and floats are little-endian. The attribute address formula
//! `offset + i * stride` covers both the interleaved and the planar layout;
//! the flag only changes what the offsets and strides contain. Compressed
//! payloads are rejected.

use std::path::Path;

use bitflags::bitflags;
use thiserror::Error;

use crate::render::mesh::{Mesh, Vertex};

/// File magic, first 8 bytes of every mesh container.
pub const MAGIC: &[u8; 8] = b"FILAMESH";

/// The container version this reader understands.
pub const VERSION: u32 = 1;

/// Marks an absent attribute in the header's offset table.
const ABSENT: u32 = u32::MAX;

bitflags! {
    /// Layout flags from the container header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MeshFlags: u32 {
        /// Vertex attributes are interleaved in a single array.
        const INTERLEAVED = 1 << 0;
        /// UVs are stored as snorm16 instead of half floats.
        const TEXCOORD_SNORM16 = 1 << 1;
        /// The payload is compressed (not supported by this reader).
        const COMPRESSION = 1 << 2;
    }
}

/// Mesh container errors
#[derive(Error, Debug)]
pub enum FilameshError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the container magic
    #[error("not a filamesh file (bad magic)")]
    BadMagic,

    /// The container version is not supported
    #[error("unsupported filamesh version {0}")]
    UnsupportedVersion(u32),

    /// The payload is compressed
    #[error("compressed filamesh payloads are not supported")]
    Compressed,

    /// The file ended before a field could be read
    #[error("file truncated while reading {0}")]
    Truncated(&'static str),

    /// The index type field holds an unknown value
    #[error("invalid index type {0}")]
    BadIndexType(u32),

    /// The position attribute is missing
    #[error("mesh has no position attribute")]
    MissingPositions,

    /// An attribute read would fall outside the vertex blob
    #[error("vertex data out of bounds reading {0}")]
    OutOfBounds(&'static str),

    /// A material name is not valid UTF-8
    #[error("material name is not valid UTF-8")]
    BadMaterialName,
}

/// Axis-aligned bounding box stored as center and half extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Box center.
    pub center: [f32; 3],
    /// Half extent along each axis.
    pub half_extent: [f32; 3],
}

/// One primitive range of the mesh, drawn with one material.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    /// First index of the range.
    pub offset: u32,
    /// Number of indices in the range.
    pub index_count: u32,
    /// Smallest vertex index referenced.
    pub min_index: u32,
    /// Largest vertex index referenced.
    pub max_index: u32,
    /// Index into the material name table.
    pub material: u32,
    /// Bounds of this part.
    pub aabb: Aabb,
}

/// A fully decoded mesh container.
#[derive(Debug)]
pub struct Filamesh {
    /// Decoded geometry, ready for [`crate::Engine::create_mesh`].
    pub mesh: Mesh,
    /// Primitive ranges.
    pub parts: Vec<MeshPart>,
    /// Bounds of the whole mesh.
    pub aabb: Aabb,
    /// Material names referenced by the parts.
    pub material_names: Vec<String>,
}

/// Reads `.filamesh` containers from disk or memory.
pub struct FilameshReader;

impl FilameshReader {
    /// Load and decode a mesh container from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Filamesh, FilameshError> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Decode a mesh container from an in-memory buffer.
    pub fn parse(bytes: &[u8]) -> Result<Filamesh, FilameshError> {
        let mut cursor = Cursor::new(bytes);

        if cursor.take(8, "magic")? != MAGIC {
            return Err(FilameshError::BadMagic);
        }
        let version = cursor.u32("version")?;
        if version != VERSION {
            return Err(FilameshError::UnsupportedVersion(version));
        }

        let part_count = cursor.u32("part count")?;
        let aabb = cursor.aabb("aabb")?;
        let flags = MeshFlags::from_bits_retain(cursor.u32("flags")?);
        if flags.contains(MeshFlags::COMPRESSION) {
            return Err(FilameshError::Compressed);
        }

        let position = AttributeSlot::read(&mut cursor, "position")?;
        let tangents = AttributeSlot::read(&mut cursor, "tangents")?;
        let _color = AttributeSlot::read(&mut cursor, "color")?;
        let uv0 = AttributeSlot::read(&mut cursor, "uv0")?;
        let _uv1 = AttributeSlot::read(&mut cursor, "uv1")?;

        let vertex_count = cursor.u32("vertex count")?;
        let vertex_size = cursor.u32("vertex blob size")? as usize;
        let vertex_blob = cursor.take(vertex_size, "vertex blob")?;

        let index_type = cursor.u32("index type")?;
        let index_count = cursor.u32("index count")?;
        let index_size = cursor.u32("index blob size")? as usize;
        let index_blob = cursor.take(index_size, "index blob")?;

        let mut parts = Vec::with_capacity(part_count as usize);
        for _ in 0..part_count {
            parts.push(MeshPart {
                offset: cursor.u32("part offset")?,
                index_count: cursor.u32("part index count")?,
                min_index: cursor.u32("part min index")?,
                max_index: cursor.u32("part max index")?,
                material: cursor.u32("part material")?,
                aabb: cursor.aabb("part aabb")?,
            });
        }

        let material_count = cursor.u32("material count")?;
        let mut material_names = Vec::with_capacity(material_count as usize);
        for _ in 0..material_count {
            let length = cursor.u32("material name length")? as usize;
            let name = cursor.take(length, "material name")?;
            // Trailing NUL follows the name bytes.
            cursor.take(1, "material name terminator")?;
            material_names.push(
                std::str::from_utf8(name)
                    .map_err(|_| FilameshError::BadMaterialName)?
                    .to_string(),
            );
        }

        let vertices = decode_vertices(vertex_blob, vertex_count, &position, &tangents, &uv0, flags)?;
        let indices = decode_indices(index_blob, index_count, index_type)?;

        Ok(Filamesh {
            mesh: Mesh::new(vertices, indices),
            parts,
            aabb,
            material_names,
        })
    }
}

/// Offset/stride pair of one vertex attribute.
struct AttributeSlot {
    offset: u32,
    stride: u32,
}

impl AttributeSlot {
    fn read(cursor: &mut Cursor<'_>, what: &'static str) -> Result<Self, FilameshError> {
        Ok(Self {
            offset: cursor.u32(what)?,
            stride: cursor.u32(what)?,
        })
    }

    fn is_present(&self) -> bool {
        self.offset != ABSENT
    }

    /// Byte range of element `index`, bounds-checked against `blob`.
    fn element<'a>(
        &self,
        blob: &'a [u8],
        index: u32,
        size: usize,
        what: &'static str,
    ) -> Result<&'a [u8], FilameshError> {
        let start = self.offset as usize + index as usize * self.stride as usize;
        let end = start + size;
        blob.get(start..end).ok_or(FilameshError::OutOfBounds(what))
    }
}

fn decode_vertices(
    blob: &[u8],
    count: u32,
    position: &AttributeSlot,
    tangents: &AttributeSlot,
    uv0: &AttributeSlot,
    flags: MeshFlags,
) -> Result<Vec<Vertex>, FilameshError> {
    if !position.is_present() {
        return Err(FilameshError::MissingPositions);
    }

    let mut vertices = Vec::with_capacity(count as usize);
    for i in 0..count {
        // Positions are half4; w is always 1 and ignored.
        let bytes = position.element(blob, i, 8, "position")?;
        let pos = [
            f16_to_f32(u16_le(bytes, 0)),
            f16_to_f32(u16_le(bytes, 2)),
            f16_to_f32(u16_le(bytes, 4)),
        ];

        let normal = if tangents.is_present() {
            let bytes = tangents.element(blob, i, 8, "tangents")?;
            let quat = [
                snorm16(i16_le(bytes, 0)),
                snorm16(i16_le(bytes, 2)),
                snorm16(i16_le(bytes, 4)),
                snorm16(i16_le(bytes, 6)),
            ];
            quat_to_normal(quat)
        } else {
            [0.0, 0.0, 1.0]
        };

        let tex_coord = if uv0.is_present() {
            let bytes = uv0.element(blob, i, 4, "uv0")?;
            if flags.contains(MeshFlags::TEXCOORD_SNORM16) {
                [snorm16(i16_le(bytes, 0)), snorm16(i16_le(bytes, 2))]
            } else {
                [f16_to_f32(u16_le(bytes, 0)), f16_to_f32(u16_le(bytes, 2))]
            }
        } else {
            [0.0, 0.0]
        };

        vertices.push(Vertex::new(pos, normal, tex_coord));
    }

    Ok(vertices)
}

fn decode_indices(blob: &[u8], count: u32, index_type: u32) -> Result<Vec<u32>, FilameshError> {
    let count = count as usize;
    match index_type {
        // u32 indices
        0 => {
            if blob.len() < count * 4 {
                return Err(FilameshError::Truncated("index blob"));
            }
            Ok((0..count).map(|i| u32_le(blob, i * 4)).collect())
        }
        // u16 indices, widened
        1 => {
            if blob.len() < count * 2 {
                return Err(FilameshError::Truncated("index blob"));
            }
            Ok((0..count).map(|i| u32::from(u16_le(blob, i * 2))).collect())
        }
        other => Err(FilameshError::BadIndexType(other)),
    }
}

/// Byte cursor over the container.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], FilameshError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + n)
            .ok_or(FilameshError::Truncated(what))?;
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, FilameshError> {
        self.take(4, what).map(|b| u32_le(b, 0))
    }

    fn f32(&mut self, what: &'static str) -> Result<f32, FilameshError> {
        self.u32(what).map(f32::from_bits)
    }

    fn aabb(&mut self, what: &'static str) -> Result<Aabb, FilameshError> {
        Ok(Aabb {
            center: [self.f32(what)?, self.f32(what)?, self.f32(what)?],
            half_extent: [self.f32(what)?, self.f32(what)?, self.f32(what)?],
        })
    }
}

fn u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn i16_le(bytes: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Convert an IEEE 754 binary16 value to f32.
fn f16_to_f32(bits: u16) -> f32 {
    let sign = u32::from(bits >> 15) << 31;
    let exponent = (bits >> 10) & 0x1f;
    let mantissa = u32::from(bits & 0x3ff);

    let bits32 = match exponent {
        // Zero or subnormal
        0 => {
            if mantissa == 0 {
                sign
            } else {
                // Renormalize the subnormal value
                let mut exponent32: u32 = 113;
                let mut mantissa = mantissa;
                while mantissa & 0x400 == 0 {
                    mantissa <<= 1;
                    exponent32 -= 1;
                }
                sign | (exponent32 << 23) | ((mantissa & 0x3ff) << 13)
            }
        }
        // Infinity or NaN
        0x1f => sign | 0x7f80_0000 | (mantissa << 13),
        _ => sign | ((u32::from(exponent) + 112) << 23) | (mantissa << 13),
    };

    f32::from_bits(bits32)
}

/// Decode a snorm16 value to [-1, 1].
fn snorm16(value: i16) -> f32 {
    (f32::from(value) / 32767.0).max(-1.0)
}

/// Rotate +Z by the tangent-frame quaternion to recover the surface normal.
fn quat_to_normal(q: [f32; 4]) -> [f32; 3] {
    let [x, y, z, w] = q;
    [
        2.0 * (x * z + w * y),
        2.0 * (y * z - w * x),
        1.0 - 2.0 * (x * x + y * y),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF_ONE: u16 = 0x3c00;
    const HALF_HALF: u16 = 0x3800;
    const HALF_MINUS_TWO: u16 = 0xc000;

    #[test]
    fn half_float_decodes_common_values() {
        assert_eq!(f16_to_f32(0x0000), 0.0);
        assert_eq!(f16_to_f32(HALF_ONE), 1.0);
        assert_eq!(f16_to_f32(HALF_HALF), 0.5);
        assert_eq!(f16_to_f32(HALF_MINUS_TWO), -2.0);
        assert_eq!(f16_to_f32(0x7bff), 65504.0);
        assert_eq!(f16_to_f32(0x8000), -0.0);
    }

    #[test]
    fn half_float_decodes_subnormals_and_specials() {
        assert_eq!(f16_to_f32(0x0001), 2.0_f32.powi(-24));
        assert_eq!(f16_to_f32(0x0200), 2.0_f32.powi(-15));
        assert_eq!(f16_to_f32(0x7c00), f32::INFINITY);
        assert_eq!(f16_to_f32(0xfc00), f32::NEG_INFINITY);
        assert!(f16_to_f32(0x7e00).is_nan());
    }

    #[test]
    fn snorm16_saturates_at_minus_one() {
        assert_eq!(snorm16(32767), 1.0);
        assert_eq!(snorm16(0), 0.0);
        assert_eq!(snorm16(-32768), -1.0);
    }

    #[test]
    fn identity_quaternion_yields_plus_z() {
        assert_eq!(quat_to_normal([0.0, 0.0, 0.0, 1.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn half_turn_about_x_yields_minus_z() {
        let normal = quat_to_normal([1.0, 0.0, 0.0, 0.0]);
        assert_eq!(normal, [0.0, 0.0, -1.0]);
    }

    // --- synthetic container ---------------------------------------------

    fn push_u32(out: &mut Vec<u8>, value: u32) {
        out.extend_from_slice(&value.to_le_bytes());
    }

    fn push_u16(out: &mut Vec<u8>, value: u16) {
        out.extend_from_slice(&value.to_le_bytes());
    }

    fn push_i16(out: &mut Vec<u8>, value: i16) {
        out.extend_from_slice(&value.to_le_bytes());
    }

    fn push_f32(out: &mut Vec<u8>, value: f32) {
        out.extend_from_slice(&value.to_le_bytes());
    }

    fn push_aabb(out: &mut Vec<u8>) {
        for _ in 0..3 {
            push_f32(out, 0.0);
        }
        for _ in 0..3 {
            push_f32(out, 1.0);
        }
    }

    /// One interleaved vertex: half4 position, snorm16 quat tangents,
    /// ubyte4 color, half2 uv. 24 bytes.
    fn push_vertex(out: &mut Vec<u8>, x: u16, y: u16, z: u16, u: u16, v: u16) {
        push_u16(out, x);
        push_u16(out, y);
        push_u16(out, z);
        push_u16(out, HALF_ONE); // w
        push_i16(out, 0); // identity tangent quaternion
        push_i16(out, 0);
        push_i16(out, 0);
        push_i16(out, 32767);
        push_u32(out, 0xffff_ffff); // color, ignored
        push_u16(out, u);
        push_u16(out, v);
    }

    /// A single interleaved triangle with one material.
    fn triangle_container() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        push_u32(&mut out, VERSION);
        push_u32(&mut out, 1); // parts
        push_aabb(&mut out);
        push_u32(&mut out, MeshFlags::INTERLEAVED.bits());
        // Attribute table: offsets within the interleaved vertex, stride 24.
        push_u32(&mut out, 0); // position offset
        push_u32(&mut out, 24); // position stride
        push_u32(&mut out, 8); // tangents offset
        push_u32(&mut out, 24);
        push_u32(&mut out, 16); // color offset
        push_u32(&mut out, 24);
        push_u32(&mut out, 20); // uv0 offset
        push_u32(&mut out, 24);
        push_u32(&mut out, u32::MAX); // uv1 absent
        push_u32(&mut out, 0);
        push_u32(&mut out, 3); // vertex count

        let mut vertices = Vec::new();
        push_vertex(&mut vertices, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000);
        push_vertex(&mut vertices, HALF_ONE, 0x0000, 0x0000, HALF_ONE, 0x0000);
        push_vertex(&mut vertices, 0x0000, HALF_ONE, 0x0000, 0x0000, HALF_ONE);
        push_u32(&mut out, vertices.len() as u32);
        out.extend_from_slice(&vertices);

        push_u32(&mut out, 1); // index type: u16
        push_u32(&mut out, 3); // index count
        push_u32(&mut out, 6); // index blob size
        push_u16(&mut out, 0);
        push_u16(&mut out, 1);
        push_u16(&mut out, 2);

        // One part covering the whole index range.
        push_u32(&mut out, 0);
        push_u32(&mut out, 3);
        push_u32(&mut out, 0);
        push_u32(&mut out, 2);
        push_u32(&mut out, 0);
        push_aabb(&mut out);

        // Material table.
        push_u32(&mut out, 1);
        let name = b"DefaultMaterial";
        push_u32(&mut out, name.len() as u32);
        out.extend_from_slice(name);
        out.push(0);

        out
    }

    #[test]
    fn parses_a_synthetic_triangle() {
        let filamesh = FilameshReader::parse(&triangle_container()).unwrap();

        assert_eq!(filamesh.mesh.vertices.len(), 3);
        assert_eq!(filamesh.mesh.indices, vec![0, 1, 2]);
        assert_eq!(filamesh.parts.len(), 1);
        assert_eq!(filamesh.parts[0].index_count, 3);
        assert_eq!(filamesh.material_names, vec!["DefaultMaterial".to_string()]);

        let v1 = filamesh.mesh.vertices[1];
        assert_eq!(v1.position, [1.0, 0.0, 0.0]);
        assert_eq!(v1.tex_coord, [1.0, 0.0]);
        // Identity tangent frame recovers the +Z normal (within snorm16 error).
        for vertex in &filamesh.mesh.vertices {
            assert!((vertex.normal[2] - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = triangle_container();
        bytes[0] = b'X';
        assert!(matches!(
            FilameshReader::parse(&bytes),
            Err(FilameshError::BadMagic)
        ));
    }

    #[test]
    fn rejects_unknown_versions() {
        let mut bytes = triangle_container();
        bytes[8..12].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            FilameshReader::parse(&bytes),
            Err(FilameshError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn rejects_compressed_payloads() {
        let mut bytes = triangle_container();
        // Flags live right after magic, version, part count and the aabb.
        let flags_offset = 8 + 4 + 4 + 24;
        let flags = (MeshFlags::INTERLEAVED | MeshFlags::COMPRESSION).bits();
        bytes[flags_offset..flags_offset + 4].copy_from_slice(&flags.to_le_bytes());
        assert!(matches!(
            FilameshReader::parse(&bytes),
            Err(FilameshError::Compressed)
        ));
    }

    #[test]
    fn rejects_truncated_files() {
        let bytes = triangle_container();
        let result = FilameshReader::parse(&bytes[..40]);
        assert!(matches!(result, Err(FilameshError::Truncated(_))));
    }

    #[test]
    fn rejects_unknown_index_types() {
        let mut bytes = triangle_container();
        // Index type sits right after the vertex blob.
        let offset = 8 + 4 + 4 + 24 + 4 + 40 + 4 + 4 + 72;
        bytes[offset..offset + 4].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            FilameshReader::parse(&bytes),
            Err(FilameshError::BadIndexType(7))
        ));
    }

    #[test]
    fn load_propagates_io_errors() {
        let result = FilameshReader::load("no-such-file.filamesh");
        assert!(matches!(result, Err(FilameshError::Io(_))));
    }
}
