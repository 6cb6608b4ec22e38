#![allow(dead_code)]

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const TWO_TUBES: &str = "ObjectType = Tube
NDims = 3
NPoints = 3
Points =
0 0 0 1
10 0 0 2
20 0 0 3
ObjectType = Tube
NDims = 3
NPoints = 1
Points =
0 10 0 0.5
";

/// Working directory of one test: removed with its content on drop.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Workspace {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name)).unwrap()
    }

    pub fn write(&self, name: &str, content: &str) -> Utf8PathBuf {
        let path = self.path(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a shell script and make it executable.
    #[cfg(unix)]
    pub fn script(&self, name: &str, body: &str) -> Utf8PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.write(name, &format!("#!/bin/sh\n{body}"));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Lines appended to `name` by the fake executables, empty if never written.
    pub fn lines(&self, name: &str) -> Vec<String> {
        fs::read_to_string(self.path(name))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Progression document with one record per `(iteration, parameters, cost)`.
pub fn progression_json(center: [f64; 3], records: &[(u32, [f64; 6], f64)]) -> String {
    let rows: Vec<Value> = records
        .iter()
        .map(|(iteration, parameters, cost)| {
            json!({
                "Iteration": iteration,
                "Parameters": parameters,
                "CostFunctionValue": cost,
            })
        })
        .collect();
    json!({
        "FixedParameters": center,
        "OptimizationParameterProgression": rows,
    })
    .to_string()
}

/// Progression of a short run drifting along +X about `(10, 0, 0)`.
pub fn drifting_progression() -> String {
    progression_json(
        [10.0, 0.0, 0.0],
        &[
            (0, [0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 8.0),
            (1, [0.0, 0.0, 0.1, 1.0, 0.0, 0.0], 4.0),
            (2, [0.0, 0.0, 0.2, 2.0, 0.0, 0.0], 2.0),
            (3, [0.0, 0.0, 0.3, 3.0, 0.0, 0.0], 1.0),
            (4, [0.0, 0.0, 0.3, 3.5, 0.0, 0.0], 1.25),
        ],
    )
}

/// Tuner configuration whose I/O paths all live in `ws`.
pub fn config_json(
    ws: &Workspace,
    analysis: &Utf8Path,
    subsample: Option<&Utf8Path>,
    sampling: Option<u32>,
) -> Value {
    let mut executables = json!({ "Analysis": analysis });
    if let Some(subsample) = subsample {
        executables["SubSampleTubes"] = json!(subsample);
    }
    let mut config = json!({
        "ParameterGroups": [
            { "Name": "IO", "Parameters": [
                { "Name": "InputVolume", "Value": ws.path("volume.mha") },
                { "Name": "InputVessel", "Value": ws.path("vessels.tre") },
                { "Name": "OutputTransform", "Value": ws.path("transform.tfm") },
                { "Name": "OptimizationProgression", "Value": ws.path("progression.json") }
            ]},
            { "Name": "Tuning", "Parameters": [ { "Name": "GaussianSigma", "Value": 1.0 } ] }
        ],
        "Executables": executables,
        "TubePointWeightsFile": ws.path("weights.json"),
    });
    if let Some(sampling) = sampling {
        config["SubSampleTubeTree"] = json!({ "Sampling": sampling });
    }
    config
}

/// Analysis stand-in: logs its arguments, keeps a copy of the configuration it
/// was handed, fails with status 4 when `fail.marker` exists and otherwise
/// writes [`drifting_progression`].
#[cfg(unix)]
pub fn fake_analysis(ws: &Workspace) -> Utf8PathBuf {
    let body = format!(
        "echo \"analysis $@\" >> {log}\n\
         cp \"$2\" {seen}\n\
         if [ -f {marker} ]; then exit 4; fi\n\
         cat > {progression} <<'EOF'\n{json}\nEOF\n",
        log = ws.path("calls.log"),
        seen = ws.path("seen_config.json"),
        marker = ws.path("fail.marker"),
        progression = ws.path("progression.json"),
        json = drifting_progression(),
    );
    ws.script("Analysis", &body)
}

/// Subsampling stand-in: logs its arguments and copies its input to its output.
#[cfg(unix)]
pub fn fake_subsample(ws: &Workspace) -> Utf8PathBuf {
    let body = format!(
        "echo \"subsample $@\" >> {log}\ncp \"$3\" \"$4\"\n",
        log = ws.path("calls.log"),
    );
    ws.script("SubSample", &body)
}
