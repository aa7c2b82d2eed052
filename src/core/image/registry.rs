//! Feature and filter registry.
//!
//! Names map to constructors in a static table. Face and text entries need a
//! model provider; without one they are skipped with a warning.

use crate::core::config::Config;
use crate::core::detector::ObjectDetector;
use crate::core::image::features::{EdgeFeature, FaceFeature, Feature, SaliencyFeature};
use crate::core::image::filters::{CropFilter, TextFilter};
use log::warn;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 外部模型提供者（人脸、文字检测）
#[derive(Clone, Default)]
pub struct ModelProviders {
    pub face: Option<Arc<dyn ObjectDetector>>,
    pub text: Option<Arc<dyn ObjectDetector>>,
}

impl ModelProviders {
    pub fn with_face(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.face = Some(detector);
        self
    }

    pub fn with_text(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.text = Some(detector);
        self
    }
}

type FeatureCtor = fn(&Config, &ModelProviders) -> Option<Box<dyn Feature>>;
type FilterCtor = fn(&Config, &ModelProviders) -> Option<Box<dyn CropFilter>>;

static FEATURES: Lazy<BTreeMap<&'static str, FeatureCtor>> = Lazy::new(|| {
    let mut m: BTreeMap<&'static str, FeatureCtor> = BTreeMap::new();
    m.insert("edge", |config, _| {
        Some(Box::new(EdgeFeature::new(&config.edge_feature)) as Box<dyn Feature>)
    });
    m.insert("face", |config, models| {
        let detector = models.face.clone()?;
        Some(Box::new(FaceFeature::new(detector, &config.face_feature)) as Box<dyn Feature>)
    });
    m.insert("saliency", |_, _| Some(Box::new(SaliencyFeature::default()) as Box<dyn Feature>));
    m
});

static FILTERS: Lazy<BTreeMap<&'static str, FilterCtor>> = Lazy::new(|| {
    let mut m: BTreeMap<&'static str, FilterCtor> = BTreeMap::new();
    m.insert("text", |config, models| {
        let detector = models.text.clone()?;
        Some(Box::new(TextFilter::new(detector, &config.text_detector)) as Box<dyn CropFilter>)
    });
    m
});

pub fn feature_names() -> Vec<&'static str> {
    FEATURES.keys().copied().collect()
}

pub fn filter_names() -> Vec<&'static str> {
    FILTERS.keys().copied().collect()
}

/// Every registered feature that can be built with the given providers.
pub fn build_features(config: &Config, models: &ModelProviders) -> Vec<Box<dyn Feature>> {
    FEATURES
        .iter()
        .filter_map(|(name, ctor)| {
            let feature = ctor(config, models);
            if feature.is_none() {
                warn!("⚠️ Feature '{}' skipped: no model provider", name);
            }
            feature
        })
        .collect()
}

/// Filters for the requested names. Unknown names are logged and ignored.
pub fn build_filters(
    names: &[&str],
    config: &Config,
    models: &ModelProviders,
) -> Vec<Box<dyn CropFilter>> {
    let mut filters = Vec::new();
    for name in names {
        match FILTERS.get(name) {
            Some(ctor) => match ctor(config, models) {
                Some(filter) => filters.push(filter),
                None => warn!("⚠️ Filter '{}' skipped: no model provider", name),
            },
            None => warn!("⚠️ Unknown filter '{}' ignored", name),
        }
    }
    filters
}
