//! On-disk cache of turntable previews, one directory of frames per scene file.
//!
//! A preview directory is keyed by the scene's path and modification time, so
//! editing a scene invalidates its preview without any bookkeeping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::UNIX_EPOCH;

use anyhow::Context;
use image::RgbaImage;
use uuid::Uuid;

use crate::host::SceneHost;
use crate::render::frame_path;
use crate::{RunSummary, TurntableBuilder};

/// What a batch run did with each file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub generated: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub cancelled: bool,
}

/// Hex key of a scene path. Name based, so it does not change between builds.
fn scene_key(scene: &Path) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, scene.as_os_str().as_encoded_bytes())
        .simple()
        .to_string()
}

pub struct PreviewCache {
    cache_dir: PathBuf,
    frame_count: usize,
    resolution: u32,
    exists: HashMap<PathBuf, bool>,
}

impl PreviewCache {
    /// Opens the cache under the user's cache directory.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_dir(Self::default_dir()?)
    }

    /// `<user cache dir>/turntable_preview/previews`
    pub fn default_dir() -> anyhow::Result<PathBuf> {
        let base = dirs::cache_dir().context("no cache directory available for this user")?;
        Ok(base.join("turntable_preview").join("previews"))
    }

    /// Opens (creating if needed) a cache rooted at `cache_dir`.
    pub fn with_dir(cache_dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("could not create cache dir {}", cache_dir.display()))?;
        log::debug!("Preview cache dir: {}", cache_dir.display());
        Ok(Self {
            cache_dir,
            frame_count: 24,
            resolution: 128,
            exists: HashMap::new(),
        })
    }

    /// Default: 24 if function not used
    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = frame_count;
        self
    }

    /// Default: 128 if function not used
    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Directory the frames of `scene` are stored in.
    pub fn preview_dir(&self, scene: &Path) -> anyhow::Result<PathBuf> {
        let modified = std::fs::metadata(scene)
            .and_then(|m| m.modified())
            .with_context(|| format!("could not stat {}", scene.display()))?;
        let stamp = modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        Ok(self
            .cache_dir
            .join(format!("{}_{}", scene_key(scene), stamp)))
    }

    /// True when the first frame of a preview for `scene` is on disk.
    /// Answers are remembered until the preview is regenerated or the cache cleared.
    pub fn has_preview(&mut self, scene: &Path) -> bool {
        if let Some(&known) = self.exists.get(scene) {
            return known;
        }
        let exists = scene.exists()
            && self
                .preview_dir(scene)
                .map(|dir| frame_path(&dir, 0).exists())
                .unwrap_or(false);
        self.exists.insert(scene.to_path_buf(), exists);
        exists
    }

    /// Renders a fresh preview of `scene` into its cache directory.
    pub fn generate_preview(
        &mut self,
        host: &mut dyn SceneHost,
        scene: &Path,
    ) -> anyhow::Result<RunSummary> {
        let result = self.try_generate(host, scene);
        self.exists.insert(scene.to_path_buf(), result.is_ok());
        match &result {
            Ok(_) => log::info!("Preview generated for {}", scene.display()),
            Err(e) => log::warn!("Preview generation failed for {}: {:#}", scene.display(), e),
        }
        result
    }

    fn try_generate(&self, host: &mut dyn SceneHost, scene: &Path) -> anyhow::Result<RunSummary> {
        anyhow::ensure!(scene.exists(), "file not found: {}", scene.display());
        let output_dir = self.preview_dir(scene)?;
        let summary = TurntableBuilder::new(output_dir.clone())
            .with_frame_count(self.frame_count)
            .with_resolution(self.resolution)
            .build()
            .render_file(host, scene)?;
        anyhow::ensure!(
            frame_path(&output_dir, 0).exists(),
            "no frames were written to {}",
            output_dir.display()
        );
        Ok(summary)
    }

    /// Loads the cached frames of `scene` in order, stopping at the first gap.
    /// Empty when there is no preview.
    pub fn load_frames(&mut self, scene: &Path) -> anyhow::Result<Vec<RgbaImage>> {
        if !self.has_preview(scene) {
            return Ok(Vec::new());
        }
        let dir = self.preview_dir(scene)?;
        let mut frames = Vec::new();
        for i in 0..self.frame_count {
            let path = frame_path(&dir, i);
            if !path.exists() {
                break;
            }
            let frame = image::open(&path)
                .with_context(|| format!("could not read {}", path.display()))?;
            frames.push(frame.to_rgba8());
        }
        log::debug!("Loaded {} preview frames for {}", frames.len(), scene.display());
        Ok(frames)
    }

    /// Generates previews for `files` one after another.
    ///
    /// Files that already have a preview are skipped unless `force` is set.
    /// `progress` is told `(index, total, file)` before each file. Setting
    /// `cancel` stops the batch before the next file.
    pub fn generate_batch(
        &mut self,
        host: &mut dyn SceneHost,
        files: &[PathBuf],
        force: bool,
        mut progress: impl FnMut(usize, usize, &Path),
        cancel: &AtomicBool,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for (i, file) in files.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }
            progress(i, files.len(), file.as_path());
            if !force && self.has_preview(file) {
                report.skipped.push(file.clone());
                continue;
            }
            match self.generate_preview(host, file) {
                Ok(_) => report.generated.push(file.clone()),
                Err(_) => report.failed.push(file.clone()),
            }
        }
        log::info!("Batch preview generation complete");
        report
    }

    /// Deletes every cached preview.
    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.exists.clear();
        if self.cache_dir.exists() {
            std::fs::remove_dir_all(&self.cache_dir)
                .with_context(|| format!("could not remove {}", self.cache_dir.display()))?;
        }
        std::fs::create_dir_all(&self.cache_dir)?;
        log::info!("Preview cache cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "turntable_cache_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn preview_dir_depends_on_path_and_mtime() {
        let root = temp_dir("dirs");
        let cache = PreviewCache::with_dir(root.join("cache")).unwrap();
        let a = root.join("a.glb");
        let b = root.join("b.glb");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let dir_a = cache.preview_dir(&a).unwrap();
        assert_eq!(dir_a, cache.preview_dir(&a).unwrap());
        assert_ne!(dir_a, cache.preview_dir(&b).unwrap());
        assert!(dir_a.starts_with(cache.cache_dir()));
        assert!(cache.preview_dir(&root.join("missing.glb")).is_err());
    }

    #[test]
    fn scene_key_is_stable() {
        assert_eq!(
            scene_key(Path::new("/models/teapot.glb")),
            "8f6b1e539b5d57daadb2f586b73de088"
        );
        assert_ne!(
            scene_key(Path::new("/models/teapot.glb")),
            scene_key(Path::new("/models/teapot2.glb"))
        );
    }

    #[test]
    fn default_dir_is_namespaced() {
        if let Ok(dir) = PreviewCache::default_dir() {
            assert!(dir.ends_with("turntable_preview/previews"));
        }
    }

    #[test]
    fn batch_generates_once_then_skips_until_forced() {
        let root = temp_dir("batch");
        let mut cache = PreviewCache::with_dir(root.join("cache"))
            .unwrap()
            .with_frame_count(4)
            .with_resolution(16);
        assert_eq!(cache.frame_count(), 4);
        assert_eq!(cache.resolution(), 16);

        let scene = root.join("wedge.obj");
        std::fs::write(
            &scene,
            "o Wedge\nv 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 3 2\nf 1 2 4\nf 1 4 3\nf 2 3 4\n",
        )
        .unwrap();
        let files = vec![scene.clone()];
        let cancel = AtomicBool::new(false);
        let mut host = crate::SoftwareHost::new();

        let mut seen = Vec::new();
        let first = cache.generate_batch(
            &mut host,
            &files,
            false,
            |i, total, file| seen.push((i, total, file.to_path_buf())),
            &cancel,
        );
        assert_eq!(first.generated, files);
        assert!(first.skipped.is_empty() && first.failed.is_empty());
        assert!(!first.cancelled);
        assert_eq!(seen, vec![(0, 1, scene.clone())]);
        assert!(cache.has_preview(&scene));

        let frames = cache.load_frames(&scene).unwrap();
        assert_eq!(frames.len(), cache.frame_count());
        assert!(frames.iter().all(|f| f.dimensions() == (16, 16)));

        let second = cache.generate_batch(&mut host, &files, false, |_, _, _| {}, &cancel);
        assert_eq!(second.skipped, files);
        assert!(second.generated.is_empty());

        let dir = cache.preview_dir(&scene).unwrap();
        std::fs::remove_file(frame_path(&dir, 3)).unwrap();
        let forced = cache.generate_batch(&mut host, &files, true, |_, _, _| {}, &cancel);
        assert_eq!(forced.generated, files);
        assert!(forced.skipped.is_empty());
        assert!(frame_path(&dir, 3).exists());
        assert_eq!(cache.load_frames(&scene).unwrap().len(), 4);
    }

    #[test]
    fn frames_load_in_order_until_a_gap() {
        let root = temp_dir("load");
        let mut cache = PreviewCache::with_dir(root.join("cache"))
            .unwrap()
            .with_frame_count(5);
        let scene = root.join("scene.glb");
        std::fs::write(&scene, b"scene").unwrap();
        assert!(!cache.has_preview(&scene));
        assert!(cache.load_frames(&scene).unwrap().is_empty());

        let dir = cache.preview_dir(&scene).unwrap();
        std::fs::create_dir_all(&dir).unwrap();
        for i in [0, 1, 3] {
            RgbaImage::new(4, 4).save(frame_path(&dir, i)).unwrap();
        }
        // the negative answer is remembered until the cache is cleared
        assert!(!cache.has_preview(&scene));
        cache.exists.clear();
        assert!(cache.has_preview(&scene));
        assert_eq!(cache.load_frames(&scene).unwrap().len(), 2);
    }

    #[test]
    fn clear_empties_the_cache() {
        let root = temp_dir("clear");
        let mut cache = PreviewCache::with_dir(root.join("cache")).unwrap();
        std::fs::write(cache.cache_dir().join("stale.png"), b"x").unwrap();
        cache.clear().unwrap();
        assert!(cache.cache_dir().exists());
        assert_eq!(std::fs::read_dir(cache.cache_dir()).unwrap().count(), 0);
    }

    #[test]
    fn cancelled_batch_does_nothing() {
        let root = temp_dir("cancel");
        let mut cache = PreviewCache::with_dir(root.join("cache")).unwrap();
        let mut host = crate::SoftwareHost::new();
        let cancel = AtomicBool::new(true);
        let mut calls = 0;
        let report = cache.generate_batch(
            &mut host,
            &[root.join("a.glb")],
            false,
            |_, _, _| calls += 1,
            &cancel,
        );
        assert!(report.cancelled);
        assert_eq!(calls, 0);
        assert!(report.generated.is_empty() && report.failed.is_empty());
    }

    #[test]
    fn missing_scene_fails_generation() {
        let root = temp_dir("missing");
        let mut cache = PreviewCache::with_dir(root.join("cache")).unwrap();
        let mut host = crate::SoftwareHost::new();
        let missing = root.join("missing.glb");
        assert!(cache.generate_preview(&mut host, &missing).is_err());
        assert!(!cache.has_preview(&missing));
    }
}
