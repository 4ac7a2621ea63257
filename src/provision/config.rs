//! Config materialization -- fixed literals or sampled generator output.

use crate::process;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// Placeholder substituted with the run name in literal config text.
pub const NAME_TOKEN: &str = "{name}";
/// Placeholder substituted with the commit hash in literal config text.
pub const COMMIT_TOKEN: &str = "{commit}";

/// How the batch's configurations come to be.
#[derive(Debug, Clone)]
pub enum NewMethod {
    /// Exactly one run, with an optional literal config (a config may be
    /// defined entirely by the image).
    Single(Option<String>),
    /// `count` runs, each config drawn by one independent invocation of the
    /// generator script.
    Multi {
        script: PathBuf,
        interpreter: String,
        interpreter_args: Vec<String>,
        count: u32,
    },
}

/// One run-to-be: name, config payload, generator body, volume.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTuple {
    pub name: String,
    pub config: Option<String>,
    /// Script body retained for reproducibility when the config was sampled.
    pub script: Option<String>,
    pub volume: String,
}

/// Produce the batch's config tuples. `Single` yields one tuple under the
/// base name; `Multi` yields `count` tuples named `<base>0..<base>{count-1}`,
/// index `i` always paired with the `i`-th generated config. Sampling
/// failures are not retried.
pub fn materialize(
    method: &NewMethod,
    base_name: &str,
    explicit_volume: Option<&str>,
) -> Result<Vec<ConfigTuple>> {
    match method {
        NewMethod::Single(config) => Ok(vec![ConfigTuple {
            name: base_name.to_string(),
            config: config.clone(),
            script: None,
            volume: explicit_volume.unwrap_or(base_name).to_string(),
        }]),
        NewMethod::Multi {
            script,
            interpreter,
            interpreter_args,
            count,
        } => {
            if *count == 0 {
                bail!("config sample count must be at least 1");
            }
            // Read the generator once; every sample runs the same body.
            let body = std::fs::read_to_string(script)
                .with_context(|| format!("failed to read config script {}", script.display()))?;

            let mut args: Vec<String> = interpreter_args.clone();
            args.push(script.display().to_string());

            let mut tuples = Vec::with_capacity(*count as usize);
            for i in 0..*count {
                let exec = process::run_capture(interpreter, &args)?;
                if !exec.success() {
                    bail!(
                        "config generator failed on sample {} (exit {})",
                        i,
                        exec.code()
                    );
                }
                let name = format!("{}{}", base_name, i);
                tuples.push(ConfigTuple {
                    volume: explicit_volume.unwrap_or(&name).to_string(),
                    name,
                    config: Some(exec.stdout.trim().to_string()),
                    script: Some(body.clone()),
                });
            }
            Ok(tuples)
        }
    }
}

/// Substitute the name and commit placeholders in literal config text.
pub fn apply_tokens(config: &str, name: &str, commit: &str) -> String {
    config
        .replace(NAME_TOKEN, name)
        .replace(COMMIT_TOKEN, commit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_single_yields_one_tuple() {
        let tuples = materialize(
            &NewMethod::Single(Some("lr=0.1".to_string())),
            "exp",
            None,
        )
        .unwrap();
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].name, "exp");
        assert_eq!(tuples[0].config.as_deref(), Some("lr=0.1"));
        assert_eq!(tuples[0].volume, "exp");
        assert!(tuples[0].script.is_none());
    }

    #[test]
    fn test_single_explicit_volume() {
        let tuples = materialize(&NewMethod::Single(None), "exp", Some("scratch")).unwrap();
        assert_eq!(tuples[0].volume, "scratch");
        assert!(tuples[0].config.is_none());
    }

    #[test]
    fn test_multi_index_pairing() {
        // The generator emits a counter it keeps in a side file, so sample i
        // deterministically produces "i" -- proving index/config pairing.
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("counter");
        let script_path = dir.path().join("gen.sh");
        let mut f = std::fs::File::create(&script_path).unwrap();
        writeln!(
            f,
            "n=$(cat {ctr} 2>/dev/null || echo 0)\necho $n\necho $((n+1)) > {ctr}",
            ctr = counter.display()
        )
        .unwrap();

        let method = NewMethod::Multi {
            script: script_path,
            interpreter: "sh".to_string(),
            interpreter_args: vec![],
            count: 3,
        };
        let tuples = materialize(&method, "exp", None).unwrap();
        assert_eq!(tuples.len(), 3);
        for (i, t) in tuples.iter().enumerate() {
            assert_eq!(t.name, format!("exp{}", i));
            assert_eq!(t.config.as_deref(), Some(i.to_string().as_str()));
            assert_eq!(t.volume, t.name);
            assert!(t.script.as_deref().unwrap().contains("echo"));
        }
    }

    #[test]
    fn test_multi_zero_count_rejected() {
        let method = NewMethod::Multi {
            script: PathBuf::from("/dev/null"),
            interpreter: "sh".to_string(),
            interpreter_args: vec![],
            count: 0,
        };
        assert!(materialize(&method, "exp", None).is_err());
    }

    #[test]
    fn test_apply_tokens() {
        let out = apply_tokens("run={name} rev={commit} lr=0.1", "exp2", "abc123");
        assert_eq!(out, "run=exp2 rev=abc123 lr=0.1");
    }

    #[test]
    fn test_apply_tokens_absent_is_identity() {
        assert_eq!(apply_tokens("lr=0.1", "exp", "abc"), "lr=0.1");
    }
}
