// matcher.rs
//
// Detección de perforaciones casi duplicadas entre origen y destino. Los ids
// no se comparten entre stores, así que la comparación usa profundidad total
// y coordenadas en los dos sistemas de referencia.
use registry_domain::{Borehole, NewBorehole};

/// Tolerancia por eje usada por la validación de importación del registro.
pub const DEFAULT_COORDINATE_TOLERANCE: f64 = 2.0;

/// Firma espacial de un registro comparable.
pub trait SpatialSignature {
  fn total_depth(&self) -> Option<f64>;

  /// Par (x, y) del sistema principal (LV95).
  fn primary_location(&self) -> (Option<f64>, Option<f64>);

  /// Par (x, y) del sistema secundario (LV03).
  fn secondary_location(&self) -> (Option<f64>, Option<f64>);
}

impl SpatialSignature for Borehole {
  fn total_depth(&self) -> Option<f64> {
    self.total_depth
  }

  fn primary_location(&self) -> (Option<f64>, Option<f64>) {
    (self.location_x, self.location_y)
  }

  fn secondary_location(&self) -> (Option<f64>, Option<f64>) {
    (self.location_x_lv03, self.location_y_lv03)
  }
}

impl SpatialSignature for NewBorehole {
  fn total_depth(&self) -> Option<f64> {
    self.total_depth
  }

  fn primary_location(&self) -> (Option<f64>, Option<f64>) {
    (self.location_x, self.location_y)
  }

  fn secondary_location(&self) -> (Option<f64>, Option<f64>) {
    (self.location_x_lv03, self.location_y_lv03)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairComparison {
  /// Ninguno de los dos lados tiene el par.
  Absent,
  Match,
  Mismatch,
}

/// Comparador de casi duplicados.
///
/// Dos registros son duplicados cuando la profundidad total coincide
/// exactamente y todo par de coordenadas comparable coincide dentro de la
/// tolerancia, con al menos un par presente en ambos lados. Un par presente
/// sólo en un lado descarta la coincidencia. Un par sólo cuenta como
/// presente si tiene ambas coordenadas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateMatcher {
  tolerance: f64,
}

impl Default for DuplicateMatcher {
  fn default() -> Self {
    DuplicateMatcher { tolerance: DEFAULT_COORDINATE_TOLERANCE }
  }
}

impl DuplicateMatcher {
  pub fn with_tolerance(tolerance: f64) -> Self {
    DuplicateMatcher { tolerance }
  }

  pub fn tolerance(&self) -> f64 {
    self.tolerance
  }

  fn compare_pair(&self, a: (Option<f64>, Option<f64>), b: (Option<f64>, Option<f64>)) -> PairComparison {
    let complete = |p: (Option<f64>, Option<f64>)| match p {
      (Some(x), Some(y)) => Some((x, y)),
      _ => None,
    };
    match (complete(a), complete(b)) {
      (None, None) => PairComparison::Absent,
      (Some((ax, ay)), Some((bx, by))) => {
        if (ax - bx).abs() <= self.tolerance && (ay - by).abs() <= self.tolerance {
          PairComparison::Match
        } else {
          PairComparison::Mismatch
        }
      }
      _ => PairComparison::Mismatch,
    }
  }

  /// `true` si `a` y `b` representan la misma perforación física.
  pub fn is_duplicate<A, B>(&self, a: &A, b: &B) -> bool
    where A: SpatialSignature + ?Sized,
          B: SpatialSignature + ?Sized
  {
    if a.total_depth() != b.total_depth() {
      return false;
    }
    let pairs = [self.compare_pair(a.primary_location(), b.primary_location()),
                 self.compare_pair(a.secondary_location(), b.secondary_location())];
    if pairs.contains(&PairComparison::Mismatch) {
      return false;
    }
    pairs.contains(&PairComparison::Match)
  }

  pub fn has_match<A, B>(&self, candidate: &A, existing: &[B]) -> bool
    where A: SpatialSignature + ?Sized,
          B: SpatialSignature
  {
    existing.iter().any(|e| self.is_duplicate(candidate, e))
  }

  /// Subsecuencia de `candidates` sin coincidencia en `existing`, en el
  /// orden original. Los candidatos no se comparan entre sí.
  pub fn remove_duplicates<T, E>(&self, candidates: &[T], existing: &[E]) -> Vec<T>
    where T: SpatialSignature + Clone,
          E: SpatialSignature
  {
    candidates.iter().filter(|c| !self.has_match(*c, existing)).cloned().collect()
  }
}
