// src/infra/artifacts.rs — Per-run artifact directory bookkeeping
//
// Layout, kept stable for external tooling:
//   <runs_dir>/<scene-slug>_<timestamp>/
//     scene_description.json
//     <object-slug>/
//       <object-slug>_generation_code.py
//       <object-slug>_corrected_generation_code.py      (when a correction ran)
//       iteration_<n>/
//         optimization_code.py                          (when an optimize pass ran)
//         <object-slug>_evaluation_results.json
//     final_scene.png

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::types::{IterationRecord, SceneDescription};

pub struct RunArtifacts {
    run_dir: PathBuf,
}

impl RunArtifacts {
    /// Create the run directory under `runs_dir`. The directory name is
    /// the scene slug plus a second-resolution timestamp.
    pub fn create(runs_dir: &Path, scene_name: &str) -> std::io::Result<Self> {
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let run_dir = runs_dir.join(format!("{}_{stamp}", slug::slugify(scene_name)));
        fs::create_dir_all(&run_dir)?;
        Ok(Self { run_dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn write_scene_description(&self, scene: &SceneDescription) -> std::io::Result<()> {
        let text = serde_json::to_string_pretty(scene)?;
        fs::write(self.run_dir.join("scene_description.json"), text)
    }

    fn object_dir(&self, object_type: &str) -> std::io::Result<PathBuf> {
        let dir = self.run_dir.join(slug::slugify(object_type));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn write_generation_code(&self, object_type: &str, code: &str) -> std::io::Result<()> {
        let dir = self.object_dir(object_type)?;
        let name = format!("{}_generation_code.py", slug::slugify(object_type));
        fs::write(dir.join(name), code)
    }

    pub fn write_corrected_generation_code(
        &self,
        object_type: &str,
        code: &str,
    ) -> std::io::Result<()> {
        let dir = self.object_dir(object_type)?;
        let name = format!("{}_corrected_generation_code.py", slug::slugify(object_type));
        fs::write(dir.join(name), code)
    }

    /// Persist one optimization iteration: the evaluation record, and the
    /// optimized code when an optimize pass ran this iteration.
    pub fn write_iteration(
        &self,
        object_type: &str,
        record: &IterationRecord,
        optimization_code: Option<&str>,
    ) -> std::io::Result<()> {
        let dir = self
            .object_dir(object_type)?
            .join(format!("iteration_{}", record.iteration));
        fs::create_dir_all(&dir)?;

        let results_name = format!("{}_evaluation_results.json", slug::slugify(object_type));
        fs::write(
            dir.join(results_name),
            serde_json::to_string_pretty(record)?,
        )?;

        if let Some(code) = optimization_code {
            fs::write(dir.join("optimization_code.py"), code)?;
        }
        Ok(())
    }

    /// Copy the final scene screenshot into the run directory.
    pub fn save_final_screenshot(&self, source: &Path) -> std::io::Result<()> {
        fs::copy(source, self.run_dir.join("final_scene.png")).map(|_| ())
    }
}
