/// STL file parser for binary and ASCII formats
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::{map, opt},
    multi::{count, many0, many1},
    number::complete::{float, le_f32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::StlError;
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Facet count stored after the 80-byte header
fn facet_count(data: &[u8]) -> usize {
    u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize
}

/// Size a binary STL with `triangles` facets must have
fn binary_len(triangles: usize) -> usize {
    triangles
        .saturating_mul(FACET_LEN)
        .saturating_add(HEADER_LEN + 4)
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(StlError::TooSmall(data.len()));
    }

    let triangle_count = facet_count(data);
    let expected = binary_len(triangle_count);
    if data.len() < expected {
        return Err(StlError::Truncated {
            triangles: triangle_count,
            expected,
            actual: data.len(),
        });
    }

    let facets = &data[HEADER_LEN + 4..expected];
    match count(binary_facet, triangle_count)(facets) {
        Ok((_, triangles)) => Ok(Mesh { triangles }),
        // Length was validated above, so this only triggers on a logic error
        Err(_) => Err(StlError::Truncated {
            triangles: triangle_count,
            expected,
            actual: data.len(),
        }),
    }
}

fn binary_vector(input: &[u8]) -> IResult<&[u8], (f32, f32, f32)> {
    tuple((le_f32, le_f32, le_f32))(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, n) = binary_vector(input)?;
    let (input, corners) = count(binary_vector, 3)(input)?;
    // Attribute byte count
    let (input, _) = take(2usize)(input)?;

    let v = |(x, y, z): (f32, f32, f32)| Vertex::new(x, y, z, n.0, n.1, n.2);
    Ok((input, Triangle::new(v(corners[0]), v(corners[1]), v(corners[2]))))
}

/// Parse an ASCII STL file.
///
/// Several `solid` blocks in one file are merged into a single mesh.
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, StlError> {
    match many1(parse_solid)(input) {
        Ok((rest, solids)) => {
            if !rest.trim().is_empty() {
                return Err(StlError::InvalidAscii(snippet(rest)));
            }
            let triangles = solids.into_iter().flatten().collect();
            Ok(Mesh { triangles })
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(StlError::InvalidAscii(snippet(e.input)))
        }
        Err(nom::Err::Incomplete(_)) => Err(StlError::InvalidAscii(String::new())),
    }
}

fn snippet(input: &str) -> String {
    input.trim_start().chars().take(32).collect()
}

fn parse_solid(input: &str) -> IResult<&str, Vec<Triangle>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = opt(not_line_ending)(input)?;
    Ok((input, triangles))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    map(
        preceded(preceded(multispace0, tag("vertex")), parse_vector3),
        |(x, y, z)| Vertex::new(x, y, z, normal.0, normal.1, normal.2),
    )(input)
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Whether `data` should be decoded as binary STL.
///
/// A binary file whose size matches its facet count wins even when its
/// header happens to start with `solid`, which many exporters write.
pub fn is_binary(data: &[u8]) -> bool {
    if data.len() >= HEADER_LEN + 4 && data.len() == binary_len(facet_count(data)) {
        return true;
    }

    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    !data[start..].starts_with(b"solid")
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if is_binary(data) {
        return parse_binary_stl(data);
    }

    match std::str::from_utf8(data) {
        Ok(text) => parse_ascii_stl(text),
        Err(_) => parse_binary_stl(data),
    }
}

/// Encode a mesh as binary STL with an empty header
pub fn write_binary_stl(mesh: &Mesh) -> Vec<u8> {
    let mut data = Vec::with_capacity(binary_len(mesh.triangles.len()));
    data.resize(HEADER_LEN, 0);
    data.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());

    for triangle in &mesh.triangles {
        let normal = triangle.calculate_normal();
        let corners = triangle.vertices.iter().map(|v| v.position.coords);
        for v in std::iter::once(normal).chain(corners) {
            for c in v.iter() {
                data.extend_from_slice(&c.to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_stl(triangles: &[[[f32; 3]; 4]]) -> Vec<u8> {
        let mut data = vec![0u8; 80];
        data[..5].copy_from_slice(b"solid");
        data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for facet in triangles {
            for v in facet {
                for c in v {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        data
    }

    const TRIANGLE: &str = "solid part one
  facet normal 0 0 1
    outer loop
      vertex 0.0 0.0 0.0
      vertex 1.0e1 0.0 0.0
      vertex 0.0 -2.5 0.0
    endloop
  endfacet
endsolid part one
";

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        // Set triangle count to 0
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let result = parse_binary_stl(&data);
        assert!(result.is_ok());
        let mesh = result.unwrap();
        assert_eq!(mesh.triangles.len(), 0);
    }

    #[test]
    fn test_parse_binary_facet() {
        let data = binary_stl(&[[
            [0.0, 0.0, 1.0],
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.0],
            [7.0, 8.0, 9.0],
        ]]);

        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        let t = &mesh.triangles[0];
        assert_eq!(t.vertices[1], Vertex::new(4.0, 5.0, 6.0, 0.0, 0.0, 1.0));
        assert_eq!(t.vertices[2].position.z, 9.0);
    }

    #[test]
    fn test_binary_too_small() {
        assert_eq!(parse_binary_stl(&[0u8; 10]), Err(StlError::TooSmall(10)));
    }

    #[test]
    fn test_binary_truncated() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 60]);

        assert_eq!(
            parse_binary_stl(&data),
            Err(StlError::Truncated {
                triangles: 2,
                expected: 184,
                actual: 144,
            })
        );
    }

    #[test]
    fn test_parse_ascii_with_names() {
        let mesh = parse_ascii_stl(TRIANGLE).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].vertices[1].position.x, 10.0);
        assert_eq!(mesh.triangles[0].vertices[2].position.y, -2.5);
        assert_eq!(mesh.triangles[0].vertices[0].normal.z, 1.0);
    }

    #[test]
    fn test_parse_ascii_multiple_solids() {
        let text = format!("{TRIANGLE}{TRIANGLE}");
        let mesh = parse_ascii_stl(&text).unwrap();
        assert_eq!(mesh.triangles.len(), 2);
    }

    #[test]
    fn test_parse_ascii_rejects_garbage() {
        let err = parse_ascii_stl("solid x\n facet normal 0 0\nendsolid").unwrap_err();
        assert!(matches!(err, StlError::InvalidAscii(_)));
    }

    #[test]
    fn test_detects_binary_with_solid_header() {
        let data = binary_stl(&[[[0.0; 3], [1.0; 3], [2.0; 3], [3.0; 3]]]);
        assert!(is_binary(&data));
        assert_eq!(parse_stl(&data).unwrap().triangles.len(), 1);
    }

    #[test]
    fn test_detects_ascii() {
        assert!(!is_binary(TRIANGLE.as_bytes()));
        assert_eq!(parse_stl(TRIANGLE.as_bytes()).unwrap().triangles.len(), 1);
    }

    #[test]
    fn test_written_cube_parses_back() {
        let cube = Mesh::cube(3.0);
        let data = write_binary_stl(&cube);
        assert_eq!(data.len(), 84 + 12 * 50);
        assert!(is_binary(&data));
        assert_eq!(parse_stl(&data).unwrap(), cube);
    }
}
