//! Reader for MetaIO tube trees (`.tre`, ASCII data only).
//!
//! A tube tree is a sequence of objects, each introduced by a block of
//! `Key = Value` header lines. Tube objects end their header with `Points =`,
//! followed by `NPoints` whitespace-separated rows whose columns are named by
//! `PointDim` (default: the `NDims` coordinates then the radius).
use std::ops::Range;

use nalgebra::Point3;
use nom::{
    bytes::complete::take_while1,
    character::complete::{char, space0, space1},
    combinator::rest,
    multi::separated_list1,
    number::complete::double,
    sequence::{delimited, preceded, separated_pair},
    IResult, Parser,
};

/// Points and radii of every tube of a tree, tubes stored back to back.
#[derive(Debug, Default)]
pub(super) struct RawTubes {
    pub points: Vec<Point3<f64>>,
    pub radii: Vec<f64>,
    pub tubes: Vec<Range<usize>>,
}

fn header_line(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        preceded(
            space0,
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        ),
        (space0, char('='), space0),
        rest,
    )
    .parse(input)
}

fn point_row(input: &str) -> IResult<&str, Vec<f64>> {
    delimited(space0, separated_list1(space1, double), space0).parse(input)
}

/// Column layout of the point rows of one object.
#[derive(Debug, Clone)]
struct Columns {
    x: usize,
    y: usize,
    z: Option<usize>,
    r: usize,
    width: usize,
}

impl Columns {
    fn default_for(ndims: usize) -> Self {
        Columns {
            x: 0,
            y: 1,
            z: (ndims > 2).then_some(2),
            r: ndims,
            width: ndims + 1,
        }
    }

    fn from_point_dim(names: &str, ndims: usize) -> Result<Self, String> {
        let names: Vec<String> = names.split_whitespace().map(str::to_lowercase).collect();
        let find = |candidates: &[&str]| {
            names
                .iter()
                .position(|n| candidates.contains(&n.as_str()))
        };
        let missing = |what: &str| format!("PointDim has no {what} column");
        Ok(Columns {
            x: find(&["x"]).ok_or_else(|| missing("x"))?,
            y: find(&["y"]).ok_or_else(|| missing("y"))?,
            z: if ndims > 2 {
                Some(find(&["z"]).ok_or_else(|| missing("z"))?)
            } else {
                None
            },
            r: find(&["r", "radius"]).ok_or_else(|| missing("radius"))?,
            width: names.len(),
        })
    }

    fn decode(&self, row: &[f64]) -> Result<(Point3<f64>, f64), String> {
        if row.len() < self.width {
            return Err(format!(
                "point row has {} values, expected {}",
                row.len(),
                self.width
            ));
        }
        let z = self.z.map(|i| row[i]).unwrap_or(0.0);
        Ok((Point3::new(row[self.x], row[self.y], z), row[self.r]))
    }
}

/// Header state of the object currently being read.
#[derive(Debug)]
struct ObjectHeader {
    is_tube: bool,
    ndims: usize,
    npoints: Option<usize>,
    point_dim: Option<String>,
}

impl ObjectHeader {
    fn new(object_type: &str) -> Self {
        ObjectHeader {
            is_tube: object_type.eq_ignore_ascii_case("tube"),
            ndims: 3,
            npoints: None,
            point_dim: None,
        }
    }
}

/// Parse the text of a tube tree.
///
/// Errors are returned as human readable reasons, prefixed with the 1-based
/// line number when they concern a specific line.
pub(super) fn parse_tre(content: &str) -> Result<RawTubes, String> {
    let mut tubes = RawTubes::default();
    let mut header = ObjectHeader::new("");
    let mut lines = content.lines().enumerate();

    while let Some((lineno, line)) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }
        let (_, (key, value)) = header_line(line)
            .map_err(|_| format!("line {}: expected `Key = Value`", lineno + 1))?;
        let value = value.trim();

        match key {
            "ObjectType" => header = ObjectHeader::new(value),
            "NDims" => {
                header.ndims = value
                    .parse()
                    .ok()
                    .filter(|n| (2..=3).contains(n))
                    .ok_or_else(|| format!("line {}: invalid NDims `{value}`", lineno + 1))?;
            }
            "NPoints" => {
                header.npoints = Some(
                    value
                        .parse()
                        .map_err(|_| format!("line {}: invalid NPoints `{value}`", lineno + 1))?,
                );
            }
            "PointDim" => header.point_dim = Some(value.to_string()),
            "BinaryData" if value.eq_ignore_ascii_case("true") => {
                return Err("binary point data is not supported".into());
            }
            "Points" => {
                let npoints = header
                    .npoints
                    .ok_or_else(|| format!("line {}: Points before NPoints", lineno + 1))?;
                let columns = match &header.point_dim {
                    Some(names) => Columns::from_point_dim(names, header.ndims)?,
                    None => Columns::default_for(header.ndims),
                };
                let start = tubes.points.len();

                for _ in 0..npoints {
                    let (lineno, row) = lines
                        .by_ref()
                        .find(|(_, l)| !l.trim().is_empty())
                        .ok_or_else(|| format!("expected {npoints} points, file ended early"))?;
                    let values = match point_row(row) {
                        Ok((remaining, values)) if remaining.is_empty() => values,
                        _ => return Err(format!("line {}: invalid point row", lineno + 1)),
                    };
                    if header.is_tube {
                        let (point, radius) = columns
                            .decode(&values)
                            .map_err(|reason| format!("line {}: {reason}", lineno + 1))?;
                        tubes.points.push(point);
                        tubes.radii.push(radius);
                    }
                }

                if header.is_tube {
                    tubes.tubes.push(start..tubes.points.len());
                }
            }
            _ => {}
        }
    }

    Ok(tubes)
}
