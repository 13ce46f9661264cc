//! The context that carries settings and caches through all conversions.

use crate::cache::{Cache, hash128};
use crate::color::icc::IccProfile;
use crate::object::Stream;
use crate::settings::{ColorSettings, ColorWarning};
use log::warn;
use pscolor_postscript::{DecodeTable, Procedure};
use std::sync::Arc;

/// A context for converting colors, images and shadings.
///
/// A context is created once per renderer. It owns the settings and the caches, which
/// can be emptied between independent jobs with [`Context::clear_caches`].
#[derive(Debug, Clone)]
pub struct Context {
    pub(crate) settings: ColorSettings,
    pub(crate) cache: Cache,
    default_cmyk_hash: Option<u128>,
}

impl Context {
    /// Create a new context.
    pub fn new(settings: ColorSettings) -> Self {
        let cache = Cache::new(settings.icc_color_cache_size);

        Self::new_with(settings, cache)
    }

    /// Create a new context that uses existing caches.
    pub fn new_with(settings: ColorSettings, cache: Cache) -> Self {
        let default_cmyk_hash = settings.default_cmyk_profile.as_deref().map(hash128);

        Self {
            settings,
            cache,
            default_cmyk_hash,
        }
    }

    /// The settings of the context.
    pub fn settings(&self) -> &ColorSettings {
        &self.settings
    }

    /// The caches of the context.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Remove all cached decode tables, ICC profiles, transforms and colors.
    pub fn clear_caches(&self) {
        self.cache.clear();
    }

    /// The content hash of the default CMYK profile, if one is set.
    pub(crate) fn default_cmyk_hash(&self) -> Option<u128> {
        self.default_cmyk_hash
    }

    pub(crate) fn warn(&self, warning: ColorWarning) {
        (self.settings.warning_sink)(warning);
    }

    pub(crate) fn decode_table(&self, procedure: &Procedure) -> Arc<DecodeTable> {
        self.cache.decode_table(procedure)
    }

    /// Build the transform of an ICC profile embedded in a stream.
    pub(crate) fn embedded_profile(&self, stream: &Stream, n: usize) -> Option<IccProfile> {
        let hash = self.cache.stream_hash(stream);

        self.cache.icc_profile(hash, stream.data(), n, || {
            warn!("failed to load embedded ICC profile with {n} components");
            self.warn(ColorWarning::IccProfileUnusable);
        })
    }

    /// The transform of the default CMYK profile, if one was configured and is usable.
    pub(crate) fn default_cmyk_profile(&self) -> Option<IccProfile> {
        let data = self.settings.default_cmyk_profile.as_ref()?;
        let hash = self.default_cmyk_hash?;

        self.cache.icc_profile(hash, data, 4, || {
            warn!("failed to load the default CMYK profile");
            self.warn(ColorWarning::IccProfileUnusable);
        })
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(ColorSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn unusable_profiles_warn_once() {
        let warnings = Arc::new(Mutex::new(vec![]));
        let sink = warnings.clone();

        let settings = ColorSettings {
            default_cmyk_profile: Some(Arc::from(&b"not a profile"[..])),
            warning_sink: Arc::new(move |w| sink.lock().unwrap().push(w)),
            ..Default::default()
        };
        let ctx = Context::new(settings);

        assert!(ctx.default_cmyk_profile().is_none());
        assert!(ctx.default_cmyk_profile().is_none());
        assert_eq!(
            warnings.lock().unwrap().as_slice(),
            &[ColorWarning::IccProfileUnusable]
        );
    }

    #[test]
    fn no_default_profile() {
        let ctx = Context::default();

        assert!(ctx.default_cmyk_profile().is_none());
    }
}
