use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use phpswap_backend::{
    CommandOutput, Invocation, PhpVersion, Privilege, ProcessInvoker, SupportedVersions,
};
use phpswap_brew::BrewClient;
use phpswap_core::{CoreError, PhpManager, SwitchStrategy};
use phpswap_platform::BrewPaths;
use tempfile::tempdir;

/// Records invocations; `php-config --version` answers from the formula dir.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Invocation>>,
}

impl Recorder {
    fn rendered(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("recorder lock")
            .iter()
            .filter(|call| call.args.first().map(String::as_str) != Some("--version"))
            .map(|call| {
                let sudo = if call.privilege == Privilege::Elevated { "sudo " } else { "" };
                format!("{sudo}{}", call.args.join(" "))
            })
            .collect()
    }
}

#[async_trait]
impl ProcessInvoker for Recorder {
    async fn run(&self, invocation: &Invocation) -> CommandOutput {
        self.calls
            .lock()
            .expect("recorder lock")
            .push(invocation.clone());

        if invocation.args == ["--version"] {
            let formula = invocation
                .program
                .parent()
                .and_then(Path::parent)
                .and_then(Path::file_name)
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            return match formula.strip_prefix("php@") {
                Some(short) => CommandOutput::success(format!("{short}.9\n")),
                None => CommandOutput::failure(127, "not found"),
            };
        }
        CommandOutput::success("")
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

fn install(root: &Path, formula: &str) {
    let bin = root.join("opt").join(formula).join("bin");
    std::fs::create_dir_all(&bin).expect("create bin dir");
    std::fs::write(bin.join("php"), "").expect("create php binary");
}

fn version(raw: &str) -> PhpVersion {
    raw.parse().expect("valid version")
}

#[tokio::test]
async fn switch_tears_down_everything_before_linking_target() {
    let root = tempdir().expect("create prefix");
    install(root.path(), "php@7.4");
    install(root.path(), "php@8.2");
    std::fs::create_dir_all(root.path().join("opt/php@8.0")).expect("broken install");

    let recorder = Arc::new(Recorder::default());
    let brew = BrewClient::new(recorder.clone(), BrewPaths::new(root.path()));
    let manager = PhpManager::new(brew, SupportedVersions::default());

    let snapshot = manager.refresh().await;
    assert_eq!(snapshot.versions(), [version("7.4"), version("8.2")]);
    assert_eq!(
        snapshot
            .get(&version("8.2"))
            .and_then(|install| install.long_version.as_ref())
            .map(|long| long.raw.as_str()),
        Some("8.2.9")
    );

    let report = manager
        .switch_to(version("7.4"), SwitchStrategy::Internal)
        .await
        .expect("switch accepted");
    assert!(report.is_clean());

    let rendered = recorder.rendered();
    let (teardown, activation) = rendered.split_at(4);
    let mut teardown = teardown.to_vec();
    teardown.sort();
    assert_eq!(
        teardown,
        [
            "sudo services stop php@7.4",
            "sudo services stop php@8.2",
            "unlink php@7.4",
            "unlink php@8.2",
        ]
    );
    assert_eq!(
        activation,
        ["link php@7.4 --overwrite --force", "sudo services start php@7.4"]
    );
}

#[tokio::test]
async fn switch_to_undetected_version_is_rejected() {
    let root = tempdir().expect("create prefix");
    install(root.path(), "php@8.1");

    let recorder = Arc::new(Recorder::default());
    let brew = BrewClient::new(recorder.clone(), BrewPaths::new(root.path()));
    let manager = PhpManager::new(brew, SupportedVersions::default());

    let result = manager
        .switch_to(version("8.0"), SwitchStrategy::Internal)
        .await;

    assert!(matches!(result, Err(CoreError::NotInstalled { .. })));
    assert!(recorder.rendered().is_empty());
}
