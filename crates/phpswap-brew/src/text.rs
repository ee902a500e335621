use std::path::Path;
use std::sync::Arc;

use phpswap_backend::{CommandOutput, Invocation, ProcessInvoker};
use phpswap_platform::BrewPaths;

/// In-place find/replace and literal search on config files.
#[derive(Clone)]
pub struct TextTools {
    invoker: Arc<dyn ProcessInvoker>,
    paths: BrewPaths,
}

impl TextTools {
    #[must_use]
    pub fn new(invoker: Arc<dyn ProcessInvoker>, paths: BrewPaths) -> Self {
        Self { invoker, paths }
    }

    /// Replace every occurrence of `original` with `replacement` in `file`.
    ///
    /// GNU sed from Homebrew is used when present because it can follow the
    /// symlinks Homebrew puts in `etc/`; otherwise the system `sed` is used.
    pub async fn sed(&self, file: &Path, original: &str, replacement: &str) -> CommandOutput {
        let invocation = self.sed_invocation(file, original, replacement);
        self.invoker.run(&invocation).await
    }

    /// Whether `file` contains the literal string `query`.
    pub async fn grep_contains(&self, file: &Path, query: &str) -> bool {
        let invocation = Invocation::new(
            "grep",
            [
                "-q".to_string(),
                "-F".to_string(),
                "--".to_string(),
                query.to_string(),
                file.display().to_string(),
            ],
        );
        self.invoker.run(&invocation).await.status == Some(0)
    }

    fn sed_invocation(&self, file: &Path, original: &str, replacement: &str) -> Invocation {
        let expression = format!("s/{}/{}/g", escape(original), escape(replacement));
        let file = file.display().to_string();

        let gsed = self.paths.gsed_binary();
        if self.invoker.file_exists(&gsed) {
            return Invocation::new(
                gsed,
                ["-i".to_string(), "--follow-symlinks".to_string(), expression, file],
            );
        }

        if cfg!(target_os = "macos") {
            Invocation::new("sed", ["-i".to_string(), String::new(), expression, file])
        } else {
            Invocation::new(
                "sed",
                ["-i".to_string(), "--follow-symlinks".to_string(), expression, file],
            )
        }
    }
}

/// Slashes delimit the sed expression and `&` stands for the match.
fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '/' | '&' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
