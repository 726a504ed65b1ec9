//! District boundary loading and lookup by name.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geo::{Coord, LineString, MapCoords, MultiPolygon, Polygon};
use hashbrown::HashMap;
use proj4rs::{proj::Proj, transform::transform};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Reader, Shape};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::population::WeightTable;

/// Target CRS for every stored geometry (EPSG:4326)
pub const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// Where to read district boundaries from
#[derive(Debug, Clone)]
pub struct BoundarySource {
    pub path: PathBuf,
    /// Attribute holding the district name
    pub name_field: String,
    /// PROJ.4 string of the file's CRS; `None` means already WGS84
    pub source_crs: Option<String>,
}

impl BoundarySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name_field: "NOMBRE".to_string(),
            source_crs: None,
        }
    }
}

/// Named district polygons in WGS84 (x = lon, y = lat)
#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    districts: HashMap<String, Arc<MultiPolygon<f64>>>,
}

impl GeometryStore {
    /// Read a boundary shapefile and reproject it to WGS84.
    pub fn load(source: &BoundarySource) -> Result<Self> {
        info!("Loading district boundaries from {}", source.path.display());
        if !source.path.is_file() {
            return Err(Error::config(format!(
                "boundary file {} not found; see static_data/districts/README.md",
                source.path.display()
            )));
        }

        let source_crs = match &source.source_crs {
            Some(crs) => Some(crs.clone()),
            None => {
                check_prj_is_geographic(&source.path)?;
                None
            }
        };

        let records = read_shapefile(&source.path)?;
        let store = Self::from_records(records, &source.name_field, source_crs.as_deref())?;

        info!("Loaded {} districts", store.len());
        Ok(store)
    }

    /// Build from already-read shapefile records.
    pub fn from_records(
        records: Vec<(Shape, Record)>,
        name_field: &str,
        source_crs: Option<&str>,
    ) -> Result<Self> {
        let reprojector = source_crs.map(Reprojector::new).transpose()?;
        let mut districts: HashMap<String, MultiPolygon<f64>> = HashMap::new();

        for (index, (shape, record)) in records.into_iter().enumerate() {
            let Some(name) = record_name(&record, name_field) else {
                warn!("Record {} has no '{}' attribute, skipping", index, name_field);
                continue;
            };
            let Some(geometry) = shape_to_geometry(shape) else {
                warn!("Record {} ('{}') is not a polygon, skipping", index, name);
                continue;
            };

            let geometry = match &reprojector {
                Some(r) => r.reproject(&geometry)?,
                None => geometry,
            };

            match districts.get_mut(&name) {
                Some(existing) => {
                    debug!("Merging additional parts into '{}'", name);
                    existing.0.extend(geometry.0);
                }
                None => {
                    districts.insert(name, geometry);
                }
            }
        }

        Ok(Self::from_polygons(districts))
    }

    /// Build from in-memory geometries already in WGS84.
    pub fn from_polygons<I, S>(polygons: I) -> Self
    where
        I: IntoIterator<Item = (S, MultiPolygon<f64>)>,
        S: Into<String>,
    {
        Self {
            districts: polygons
                .into_iter()
                .map(|(name, geometry)| (name.into(), Arc::new(geometry)))
                .collect(),
        }
    }

    /// Boundary of a district by name.
    pub fn lookup(&self, name: &str) -> Result<&Arc<MultiPolygon<f64>>> {
        self.districts.get(name).ok_or_else(|| Error::NotFound {
            neighborhood: name.to_string(),
        })
    }

    /// Fail if any weighted neighborhood has no boundary.
    pub fn ensure_covers(&self, weights: &WeightTable) -> Result<()> {
        for name in weights.names() {
            self.lookup(name)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<MultiPolygon<f64>>)> {
        self.districts.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }
}

/// Reads all shapes + attribute records from a given `.shp` file path.
pub fn read_shapefile(path: &Path) -> Result<Vec<(Shape, Record)>> {
    let mut reader = Reader::from_path(path)?;
    let mut items = Vec::new();
    for result in reader.iter_shapes_and_records() {
        items.push(result?);
    }
    Ok(items)
}

/// Without an explicit CRS we can only accept files that are already geographic.
fn check_prj_is_geographic(shp_path: &Path) -> Result<()> {
    let prj = shp_path.with_extension("prj");
    let Ok(wkt) = fs::read_to_string(&prj) else {
        return Ok(());
    };
    if wkt.trim_start().starts_with("PROJCS") {
        return Err(Error::config(format!(
            "{} declares a projected CRS; set source_crs to its PROJ.4 definition",
            prj.display()
        )));
    }
    Ok(())
}

fn record_name(record: &Record, field: &str) -> Option<String> {
    match record.get(field) {
        Some(FieldValue::Character(Some(value))) => {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        _ => None,
    }
}

fn shape_to_geometry(shape: Shape) -> Option<MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(p) => Some(rings_to_geometry(p.rings(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::PolygonM(p) => Some(rings_to_geometry(p.rings(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::PolygonZ(p) => Some(rings_to_geometry(p.rings(), |pt| Coord { x: pt.x, y: pt.y })),
        _ => None,
    }
}

/// Group each outer ring with the inner rings that follow it (shapefile ordering).
fn rings_to_geometry<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Coord<f64>) -> MultiPolygon<f64> {
    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes: Vec<LineString<f64>> = Vec::new();

    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => {
                if let Some(ext) = exterior.take() {
                    polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
                }
                exterior = Some(points.iter().map(&xy).collect());
            }
            PolygonRing::Inner(points) => {
                let ls: LineString<f64> = points.iter().map(&xy).collect();
                if exterior.is_some() {
                    holes.push(ls);
                } else {
                    // Hole with no preceding shell; keep it as a shell of its own
                    polygons.push(Polygon::new(ls, vec![]));
                }
            }
        }
    }
    if let Some(ext) = exterior {
        polygons.push(Polygon::new(ext, holes));
    }

    MultiPolygon::new(polygons)
}

/// Single-step reprojection from a source CRS into WGS84 degrees.
struct Reprojector {
    from: Proj,
    to: Proj,
    geographic_source: bool,
}

impl Reprojector {
    fn new(source_crs: &str) -> Result<Self> {
        let from = Proj::from_proj_string(source_crs)
            .map_err(|e| Error::Projection(format!("invalid source CRS '{}': {}", source_crs, e)))?;
        let to = Proj::from_proj_string(WGS84_PROJ4)
            .map_err(|e| Error::Projection(format!("invalid target CRS: {}", e)))?;
        let geographic_source =
            source_crs.contains("+proj=longlat") || source_crs.contains("+proj=latlong");
        Ok(Self {
            from,
            to,
            geographic_source,
        })
    }

    fn project(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        // Geographic input is expected in radians; projected input in meters
        let mut point = if self.geographic_source {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.from, &self.to, &mut point)
            .map_err(|e| Error::Projection(format!("transform failed at {:?}: {}", coord, e)))?;
        Ok(Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        })
    }

    fn reproject(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        geometry.try_map_coords(|coord| self.project(coord))
    }
}
