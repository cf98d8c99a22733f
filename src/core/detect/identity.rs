//! Face identity matching against a gallery of known people.
//!
//! Face localisation and encoding come from an external [`FaceEncoder`];
//! this module only owns the gallery and the nearest-neighbour decision.

use super::{Analyzer, BoundingBox, IdentityMatch, UNKNOWN_IDENTITY};
use crate::core::error::{DetectorError, PipelineError};
use crate::core::video::Frame;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const REFERENCE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// A located face and its feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEncoding {
    pub region: BoundingBox,
    pub encoding: Vec<f32>,
}

/// Backend that finds faces and encodes them. Zero or many faces per frame.
pub trait FaceEncoder: Send + Sync {
    fn encode(&self, frame: &Frame) -> Result<Vec<FaceEncoding>, DetectorError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnownIdentity {
    pub name: String,
    pub encoding: Vec<f32>,
}

/// How close the nearest known face must be to count as a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Always take the nearest known identity.
    Nearest,
    /// Nearest identity only if its distance is `<= max_distance`.
    WithinDistance { max_distance: f32 },
}

impl MatchPolicy {
    pub fn accepts(&self, distance: f32) -> bool {
        match self {
            MatchPolicy::Nearest => distance.is_finite(),
            MatchPolicy::WithinDistance { max_distance } => distance <= *max_distance,
        }
    }
}

/// Known identities, one encoding per name. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    identities: Vec<KnownIdentity>,
}

impl Gallery {
    pub fn new(identities: Vec<KnownIdentity>) -> Self {
        let mut gallery = Self::default();
        for identity in identities {
            gallery.insert_first_wins(identity);
        }
        gallery
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads every reference image in `dir`.
    ///
    /// Files are visited in name order. The identity name is the file stem
    /// minus its last character (`alice1.jpg` -> `alice`). Only the first
    /// face of each file is used, and the first file for a name wins.
    /// Files that fail to decode or contain no face are skipped.
    pub fn load_dir(
        dir: &Path,
        encoder: &dyn FaceEncoder,
        max_threads: usize,
    ) -> Result<Self, PipelineError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            PipelineError::Gallery(format!("cannot read reference directory {:?}: {}", dir, e))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_reference_image(p))
            .collect();
        files.sort();

        let num_threads = num_cpus::get().min(max_threads).max(1);
        debug!(
            "Encoding {} reference images on {} threads",
            files.len(),
            num_threads
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| PipelineError::Gallery(format!("thread pool: {}", e)))?;

        let encoded: Vec<Option<KnownIdentity>> = pool.install(|| {
            files
                .par_iter()
                .map(|path| encode_reference(path, encoder))
                .collect()
        });

        let mut gallery = Gallery::empty();
        for identity in encoded.into_iter().flatten() {
            gallery.insert_first_wins(identity);
        }

        info!(
            "👥 Loaded {} known identities from {:?}",
            gallery.len(),
            dir
        );
        Ok(gallery)
    }

    fn insert_first_wins(&mut self, identity: KnownIdentity) {
        if self.get(&identity.name).is_some() {
            debug!("Skipping duplicate reference for {}", identity.name);
            return;
        }
        self.identities.push(identity);
    }

    pub fn get(&self, name: &str) -> Option<&KnownIdentity> {
        self.identities.iter().find(|id| id.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.identities.iter().map(|id| id.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Closest known identity and its distance.
    pub fn nearest(&self, encoding: &[f32]) -> Option<(&KnownIdentity, f32)> {
        self.identities
            .iter()
            .map(|id| (id, euclidean_distance(&id.encoding, encoding)))
            .filter(|(_, d)| d.is_finite())
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// `alice1.jpg` -> `alice`. `None` when nothing is left after stripping.
pub fn identity_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let mut chars = stem.chars();
    chars.next_back()?;
    let name = chars.as_str();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Distance between two encodings; infinite when their lengths differ.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn is_reference_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| REFERENCE_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

fn encode_reference(path: &Path, encoder: &dyn FaceEncoder) -> Option<KnownIdentity> {
    let Some(name) = identity_name(path) else {
        warn!("⚠️ Reference {:?} has no usable name, skipped", path);
        return None;
    };

    let img = match image::open(path) {
        Ok(img) => img,
        Err(e) => {
            debug!("Reference {:?} failed to decode: {}", path, e);
            return None;
        }
    };

    let frame = Frame::from_image(&img, 0, 0);
    match encoder.encode(&frame) {
        Ok(faces) => faces.into_iter().next().map(|face| KnownIdentity {
            name,
            encoding: face.encoding,
        }),
        Err(e) => {
            debug!("Reference {:?} failed to encode: {}", path, e);
            None
        }
    }
}

/// Labels every face in a frame with its nearest known identity.
pub struct IdentityDetector {
    encoder: Box<dyn FaceEncoder>,
    gallery: Arc<Gallery>,
    policy: MatchPolicy,
}

impl IdentityDetector {
    pub fn new(encoder: Box<dyn FaceEncoder>, gallery: Arc<Gallery>, policy: MatchPolicy) -> Self {
        Self {
            encoder,
            gallery,
            policy,
        }
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn match_face(&self, face: &FaceEncoding) -> IdentityMatch {
        let nearest = self.gallery.nearest(&face.encoding);
        let (name, match_score) = match nearest {
            Some((identity, distance)) if self.policy.accepts(distance) => {
                (identity.name.clone(), distance)
            }
            Some((_, distance)) => (UNKNOWN_IDENTITY.to_string(), distance),
            None => (UNKNOWN_IDENTITY.to_string(), f32::INFINITY),
        };

        IdentityMatch {
            name,
            match_score,
            region: face.region,
        }
    }
}

impl Analyzer for IdentityDetector {
    type Output = Vec<IdentityMatch>;

    fn name(&self) -> &str {
        "identity"
    }

    fn analyze(&mut self, frame: &Frame) -> Result<Vec<IdentityMatch>, DetectorError> {
        let faces = self.encoder.encode(frame)?;
        Ok(faces.iter().map(|face| self.match_face(face)).collect())
    }
}
