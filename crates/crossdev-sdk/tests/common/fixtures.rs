//! SDK family fixtures
//!
//! Layout of a fixture temp dir:
//!
//! ```text
//! <tmp>/scripts/<family>/{add,get-config,list,remove,update}
//! <tmp>/root/<family>/<profile>/<version>/<arch>/...
//! <tmp>/catalog-<family>.json    (printed by the list script)
//! <tmp>/cache/                   (catalog caches)
//! ```

use crossdev_core::types::Sdk;
use crossdev_sdk::SdkFamily;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SETUP_PATTERN: &str = "environment-setup-*";

/// One SDK family backed by shell scripts
pub struct FamilyFixture {
    temp: TempDir,
    pub name: String,
}

impl FamilyFixture {
    /// Family with working scripts and an empty catalog
    pub fn new(name: &str) -> Self {
        let fixture = Self {
            temp: TempDir::new().expect("create temp dir"),
            name: name.to_string(),
        };
        std::fs::create_dir_all(fixture.scripts_dir()).unwrap();
        std::fs::create_dir_all(fixture.root_dir()).unwrap();
        std::fs::create_dir_all(fixture.cache_dir()).unwrap();

        fixture.write_script(
            "get-config",
            &format!(
                r#"cat <<'JSON'
{{"familyName":"{}","description":"{} test family","rootDir":"{}","envSetupFile":"{}"}}
JSON"#,
                name,
                name,
                fixture.root_dir().display(),
                SETUP_PATTERN
            ),
        );
        fixture.set_catalog(&[]);
        fixture.write_script(
            "list",
            &format!("cat '{}'", fixture.catalog_file().display()),
        );
        fixture.write_script("add", &fixture.add_script_installing("agl", "7.0.0", "aarch64"));
        fixture.write_script("remove", r#"rm -rf "$1""#);
        fixture.write_script("update", "exit 0");
        fixture
    }

    pub fn base(&self) -> &Path {
        self.temp.path()
    }

    /// Directory holding one subdirectory per family
    pub fn scripts_root(&self) -> PathBuf {
        self.temp.path().join("scripts")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.scripts_root().join(&self.name)
    }

    pub fn root_dir(&self) -> PathBuf {
        self.temp.path().join("root").join(&self.name)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.temp.path().join(format!("catalog-{}.json", self.name))
    }

    /// Write an executable `/bin/sh` script into the family directory
    pub fn write_script(&self, role: &str, body: &str) {
        write_executable(&self.scripts_dir().join(role), body);
    }

    pub fn remove_script(&self, role: &str) {
        std::fs::remove_file(self.scripts_dir().join(role)).unwrap();
    }

    /// Replace the catalog printed by the `list` script
    pub fn set_catalog(&self, sdks: &[Sdk]) {
        let json = serde_json::to_string_pretty(sdks).unwrap();
        std::fs::write(self.catalog_file(), json).unwrap();
    }

    /// Body of an `add` script that lays out an install like a real SDK
    /// installer, printing some progress on the way
    pub fn add_script_installing(&self, profile: &str, version: &str, arch: &str) -> String {
        let dir = self.install_dir(profile, version, arch);
        format!(
            r#"echo "installing from $*"
mkdir -p '{dir}'
echo "export CC={arch}-gcc" > '{dir}/environment-setup-{arch}-{profile}-linux'
echo "Timestamp 202401151230" > '{dir}/version-{arch}-{profile}-linux'
echo "done""#,
            dir = dir.display(),
            arch = arch,
            profile = profile,
        )
    }

    pub fn install_dir(&self, profile: &str, version: &str, arch: &str) -> PathBuf {
        self.root_dir().join(profile).join(version).join(arch)
    }

    /// Lay out an installed SDK below the root directory
    pub fn install_sdk(
        &self,
        profile: &str,
        version: &str,
        arch: &str,
        metadata: Option<&str>,
    ) -> PathBuf {
        let dir = self.install_dir(profile, version, arch);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("environment-setup-{}-{}-linux", arch, profile)),
            format!("export CC={}-gcc\n", arch),
        )
        .unwrap();
        if let Some(metadata) = metadata {
            std::fs::write(dir.join("version-1"), metadata).unwrap();
        }
        dir
    }

    pub async fn load(&self) -> SdkFamily {
        SdkFamily::load(self.scripts_dir())
            .await
            .expect("fixture family loads")
    }
}

pub fn write_executable(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}

/// Catalog entry as found in a remote catalog
pub fn catalog_entry(profile: &str, version: &str, arch: &str) -> Sdk {
    Sdk {
        name: format!("{}-{}-{}", profile, arch, version),
        description: format!("{} {} for {}", profile, version, arch),
        profile: profile.to_string(),
        version: version.to_string(),
        arch: arch.to_string(),
        url: format!(
            "https://download.example.org/{}/{}/{}/sdk.sh",
            profile, version, arch
        ),
        size: "812M".to_string(),
        md5sum: "4b1c0f0f6a2d5e3c".to_string(),
        ..Default::default()
    }
}
