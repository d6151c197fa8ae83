// Enable Clippy lints that are disabled by default.
// https://rust-lang.github.io/rust-clippy/stable/index.html
#![warn(clippy::pedantic)]

use cnb_shim::data::group::GroupMetadata;
use cnb_shim::support::digest::md5;
use cnb_shim::support::log::{CapturedOutput, Logger};
use cnb_shim::support::manifest::{cache_file_name, Manifest};
use cnb_shim::{
    DefaultDetector, Finalizer, Invocation, ManifestInstaller, PlatformLayout, ProcessError,
    ProcessRunner, Releaser, Stack, Supplier,
};
use cnb_shim_common::read_toml_file;
use flate2::write::GzEncoder;
use flate2::Compression;
use indoc::{formatdoc, indoc};
use std::cell::RefCell;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const NODE_BUILDPACK_ID: &str = "org.cloudfoundry.node";

#[test]
fn stage_app_with_a_v2_buildpack_and_two_shimmed_buildpacks() {
    let staging = Staging::new();
    staging.run_v2_buildpack(0);

    staging.supply(1);
    staging.supply(2);
    staging.finalize(2);

    let app_dir = staging.path("app");
    assert!(app_dir.join("server.js").is_file());
    assert!(!app_dir.join(".cloudfoundry").join("sentinel").exists());
    let launcher = app_dir.join(".cloudfoundry").join("launcher");
    assert_eq!(
        fs::metadata(&launcher).unwrap().permissions().mode() & 0o111,
        0o111
    );

    let deps_dir = staging.path("deps");
    assert_eq!(
        fs::read_to_string(deps_dir.join("buildpack.0").join("layer").join("bin").join("python"))
            .unwrap(),
        "python"
    );
    assert!(deps_dir
        .join("buildpack.0")
        .join("layer")
        .join("env.build")
        .join("PYTHONHOME")
        .is_file());
    assert!(deps_dir
        .join(NODE_BUILDPACK_ID)
        .join("node")
        .join("bin")
        .join("node")
        .is_file());
    assert!(deps_dir.join("config").join("metadata.toml").is_file());

    let group: GroupMetadata = read_toml_file(staging.layout.group_metadata()).unwrap();
    let group_ids: Vec<&str> = group
        .buildpacks
        .iter()
        .map(|buildpack| buildpack.id.as_str())
        .collect();
    assert_eq!(group_ids, ["buildpack.0", NODE_BUILDPACK_ID]);

    let installed_buildpack = staging
        .layout
        .buildpacks_dir
        .join(NODE_BUILDPACK_ID)
        .join("latest");
    assert!(installed_buildpack.join("bin").join("build").is_file());

    assert_eq!(
        fs::read_to_string(staging.path("profile").join("0_shim.sh")).unwrap(),
        indoc! {r#"
            export CNB_STACK_ID="org.cloudfoundry.stacks.cflinuxfs3"
            export CNB_LAYERS_DIR="$DEPS_DIR"
            export CNB_APP_DIR="$HOME"
            exec $HOME/.cloudfoundry/launcher "$2"
        "#}
    );

    let mut release_output = Vec::new();
    Releaser {
        app_dir: app_dir.clone(),
    }
    .release(&mut release_output)
    .unwrap();
    assert_eq!(
        String::from_utf8(release_output).unwrap(),
        "default_process_types:\n  web: node server.js\n"
    );

    let output = staging.output.contents();
    assert!(output.contains("-----> Nodejs Buildpack version 1.6.28"));
    assert!(output.contains("-----> Installing org.cloudfoundry.node 0.0.2"));
    assert!(output.contains("-----> Installing lifecycle 0.5.0"));
}

#[test]
fn detector_and_builder_are_run_once_in_order() {
    let staging = Staging::new();

    staging.supply(0);
    staging.finalize(0);

    let programs: Vec<String> = staging
        .lifecycle
        .invocations
        .borrow()
        .iter()
        .map(|invocation| {
            invocation
                .program
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(programs, ["detector", "builder"]);
}

#[test]
fn cacheable_layers_survive_into_the_next_staging() {
    let staging = Staging::new();
    staging.supply(0);
    staging.finalize(0);

    let cached_layers = staging.path("cache").join("cnb").join(NODE_BUILDPACK_ID);
    assert!(cached_layers.join("node").join("bin").join("node").is_file());
    assert!(cached_layers.join("node.toml").is_file());
    assert!(!cached_layers.join("npm-cache").exists());
    assert!(!cached_layers.join("npm-cache.toml").exists());
    assert_eq!(
        fs::read_to_string(staging.path("cache").join("BUILDPACK_METADATA")).unwrap(),
        "language: nodejs\nversion: 1.6.28\n"
    );

    let restaging = Staging::with_cache_from(&staging);
    restaging.supply(0);
    restaging.finalize(0);

    assert_eq!(
        *restaging.lifecycle.restored_layers.borrow(),
        [String::from("node")]
    );
}

/// Stands in for the lifecycle `detector` and `builder` binaries.
#[derive(Default)]
struct FakeLifecycle {
    invocations: RefCell<Vec<Invocation>>,
    restored_layers: RefCell<Vec<String>>,
}

impl FakeLifecycle {
    fn detect(invocation: &Invocation) {
        fs::write(
            flag_value(invocation, "-group"),
            formatdoc! {r#"
                [[buildpacks]]
                id = "{NODE_BUILDPACK_ID}"
                version = "0.0.2"
            "#},
        )
        .unwrap();
        fs::write(flag_value(invocation, "-plan"), "").unwrap();
    }

    fn build(&self, invocation: &Invocation) {
        let buildpack_layers = flag_value(invocation, "-layers").join(NODE_BUILDPACK_ID);

        if buildpack_layers.is_dir() {
            let mut restored: Vec<String> = fs::read_dir(&buildpack_layers)
                .unwrap()
                .map(|entry| entry.unwrap().path())
                .filter(|path| path.is_dir())
                .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
                .collect();
            restored.sort();
            self.restored_layers.borrow_mut().extend(restored);
        }

        write_layer(&buildpack_layers, "node", "bin/node", true);
        write_layer(&buildpack_layers, "npm-cache", "index", false);

        let config_dir = flag_value(invocation, "-layers").join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("metadata.toml"),
            indoc! {r#"
                [[processes]]
                type = "web"
                command = "node server.js"
            "#},
        )
        .unwrap();
    }
}

impl ProcessRunner for FakeLifecycle {
    fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
        self.invocations.borrow_mut().push(invocation.clone());
        assert_eq!(
            invocation.env,
            [(
                OsString::from("CNB_STACK_ID"),
                OsString::from("org.cloudfoundry.stacks.cflinuxfs3")
            )]
        );
        assert!(invocation.program.is_file());

        match invocation.program.file_name().and_then(OsStr::to_str) {
            Some("detector") => Self::detect(invocation),
            Some("builder") => self.build(invocation),
            other => panic!("unexpected lifecycle binary {other:?}"),
        }

        Ok(())
    }
}

fn flag_value(invocation: &Invocation, flag: &str) -> PathBuf {
    let position = invocation
        .args
        .iter()
        .position(|arg| arg == flag)
        .unwrap();

    PathBuf::from(&invocation.args[position + 1])
}

fn write_layer(buildpack_layers: &Path, name: &str, file: &str, cache: bool) {
    let layer_file = buildpack_layers.join(name).join(file);
    fs::create_dir_all(layer_file.parent().unwrap()).unwrap();
    fs::write(layer_file, name).unwrap();
    fs::write(
        buildpack_layers.join(format!("{name}.toml")),
        format!("launch = true\ncache = {cache}\n"),
    )
    .unwrap();
}

/// A V2 staging environment with a cached shim buildpack at `buildpack/`.
struct Staging {
    root: TempDir,
    layout: PlatformLayout,
    stack: Stack,
    manifest: Manifest,
    lifecycle: FakeLifecycle,
    logger: Logger,
    output: CapturedOutput,
}

impl Staging {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();

        let app_dir = root.path().join("app");
        fs::create_dir_all(&app_dir).unwrap();
        fs::write(app_dir.join("server.js"), "").unwrap();
        fs::write(app_dir.join("package.json"), "{}").unwrap();
        fs::create_dir_all(root.path().join("cache")).unwrap();

        let buildpack_dir = root.path().join("buildpack");
        write_cached_buildpack(&buildpack_dir);

        let (logger, output) = Logger::in_memory();

        Self {
            layout: PlatformLayout::rooted_at(root.path()),
            stack: Stack::new("cflinuxfs3").unwrap(),
            manifest: Manifest::load(&buildpack_dir).unwrap(),
            lifecycle: FakeLifecycle::default(),
            logger,
            output,
            root,
        }
    }

    fn with_cache_from(previous: &Staging) -> Self {
        let staging = Self::new();
        fs::remove_dir_all(staging.path("cache")).unwrap();
        fs::rename(previous.path("cache"), staging.path("cache")).unwrap();
        staging
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    /// A plain V2 buildpack that supplies a dependency without knowing about CNBs.
    fn run_v2_buildpack(&self, phase_index: usize) {
        let deps = self.path("deps").join(phase_index.to_string());
        fs::create_dir_all(deps.join("bin")).unwrap();
        fs::create_dir_all(deps.join("env")).unwrap();
        fs::write(deps.join("bin").join("python"), "python").unwrap();
        fs::write(deps.join("env").join("PYTHONHOME"), "/deps/0").unwrap();
    }

    fn supply(&self, phase_index: usize) {
        let installer = ManifestInstaller::new(&self.manifest, &self.logger);

        Supplier {
            app_dir: self.path("app"),
            deps_dir: self.path("deps"),
            phase_index,
            buildpack_dir: self.path("buildpack"),
            layout: self.layout.clone(),
            stack: &self.stack,
            manifest: &self.manifest,
            installer: &installer,
            logger: &self.logger,
        }
        .supply()
        .unwrap();
    }

    fn finalize(&self, phase_index: usize) {
        let installer = ManifestInstaller::new(&self.manifest, &self.logger);
        let lifecycle_dir = self.path("lifecycle");
        let detector = DefaultDetector::new(
            &self.layout,
            &lifecycle_dir,
            &self.stack,
            &installer,
            &self.lifecycle,
            &self.logger,
        );

        Finalizer {
            app_dir: self.path("app"),
            cache_dir: self.path("cache"),
            deps_dir: self.path("deps"),
            phase_index,
            profile_dir: self.path("profile"),
            lifecycle_dir,
            layout: self.layout.clone(),
            stack: &self.stack,
            manifest: &self.manifest,
            installer: &installer,
            detector: &detector,
            runner: &self.lifecycle,
            logger: &self.logger,
        }
        .finalize()
        .unwrap();
    }
}

fn write_cached_buildpack(buildpack_dir: &Path) {
    let dependencies_dir = buildpack_dir.join("dependencies");
    fs::create_dir_all(&dependencies_dir).unwrap();
    fs::write(buildpack_dir.join("VERSION"), "1.6.28\n").unwrap();
    fs::write(
        buildpack_dir.join("order.toml"),
        formatdoc! {r#"
            [[groups]]
            labels = ["nodejs"]

            [[groups.buildpacks]]
            id = "{NODE_BUILDPACK_ID}"
            version = "latest"
        "#},
    )
    .unwrap();

    let node_uri = "https://buildpacks.example.com/org.cloudfoundry.node-0.0.2.tgz";
    let node_archive = dependencies_dir.join(cache_file_name(node_uri));
    write_tgz(&node_archive, &["bin/detect", "bin/build"]);

    let lifecycle_uri = "https://buildpacks.example.com/lifecycle-0.5.0.tgz";
    let lifecycle_archive = dependencies_dir.join(cache_file_name(lifecycle_uri));
    write_tgz(
        &lifecycle_archive,
        &[
            "lifecycle-v0.5.0/detector",
            "lifecycle-v0.5.0/builder",
            "lifecycle-v0.5.0/launcher",
        ],
    );

    fs::write(
        buildpack_dir.join("manifest.yml"),
        formatdoc! {"
            language: nodejs
            dependencies:
              - name: {NODE_BUILDPACK_ID}
                version: 0.0.2
                uri: {node_uri}
                md5: {node_md5}
                cf_stacks: [cflinuxfs3]
              - name: lifecycle
                version: 0.5.0
                uri: {lifecycle_uri}
                md5: {lifecycle_md5}
                cf_stacks: [cflinuxfs3]
            ",
            node_md5 = md5(&node_archive).unwrap(),
            lifecycle_md5 = md5(&lifecycle_archive).unwrap(),
        },
    )
    .unwrap();
}

fn write_tgz(path: &Path, executables: &[&str]) {
    let mut builder = tar::Builder::new(GzEncoder::new(
        File::create(path).unwrap(),
        Compression::default(),
    ));

    for executable in executables {
        let contents = format!("#!/usr/bin/env bash\necho {executable}\n");
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, executable, contents.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
}
