use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;

use crate::catalog::descriptor::{read_descriptor, sidecar_path};
use crate::catalog::{CatalogError, PlatformCatalog, PluginCatalog};
use crate::core::{ArtifactHandle, ArtifactRef, PlatformRelease, PluginHistory, Version};

#[derive(Clone, Debug)]
pub struct FsCatalogOptions {
    /// 视为插件载荷的扩展名
    pub plugin_extensions: Vec<String>,
    /// 视为平台发布的扩展名
    pub platform_extension: String,
}

impl Default for FsCatalogOptions {
    fn default() -> Self {
        Self {
            plugin_extensions: vec!["hpi".to_string(), "jpi".to_string()],
            platform_extension: "war".to_string(),
        }
    }
}

/// 本地 Maven 风格仓库：
/// `<root>/<group/path>/<artifactId>/<version>/<artifactId>-<version>.<ext>`
///
/// 每次 list 都重新扫描；描述文件在真正需要时才读取。
pub struct FsCatalog {
    root: PathBuf,
    options: FsCatalogOptions,
}

#[derive(Debug)]
struct FsHandle {
    gav: String,
    payload: PathBuf,
    descriptor: PathBuf,
}

impl ArtifactHandle for FsHandle {
    fn required_platform_version(&self) -> Result<Version, CatalogError> {
        read_descriptor(&self.descriptor)
            .map(|d| d.required_platform)
            .map_err(|e| CatalogError::Descriptor {
                artifact: self.gav.clone(),
                reason: e.to_string(),
            })
    }

    fn resolve(&self) -> Result<PathBuf, CatalogError> {
        let located = self.payload.parent().map(Path::is_dir).unwrap_or(false);
        if !located {
            return Err(CatalogError::Resolve {
                artifact: self.gav.clone(),
                reason: format!("version directory of {} is gone", self.payload.display()),
            });
        }
        Ok(self.payload.clone())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Kind {
    Plugin,
    Platform,
}

struct Coordinates {
    group: String,
    artifact_id: String,
    version: Version,
    extension: String,
    kind: Kind,
}

#[derive(Default)]
struct Scan {
    plugins: BTreeMap<String, PluginHistory>,
    platform: BTreeMap<Version, PlatformRelease>,
}

impl FsCatalog {
    pub fn open(root: impl Into<PathBuf>, options: FsCatalogOptions) -> Result<Self, CatalogError> {
        let catalog = Self {
            root: root.into(),
            options,
        };
        catalog.check_root()?;
        Ok(catalog)
    }

    fn check_root(&self) -> Result<(), CatalogError> {
        if !self.root.is_dir() {
            return Err(CatalogError::Unavailable {
                path: self.root.clone(),
                reason: "repository root is not a directory".to_string(),
            });
        }
        Ok(())
    }

    fn scan(&self) -> Result<Scan, CatalogError> {
        self.check_root()?;

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .hidden(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut scan = Scan::default();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("repository walk: skip unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            let Some(coords) = self.coordinates(path) else {
                continue;
            };

            let handle = Arc::new(FsHandle {
                gav: format!("{}:{}:{}", coords.group, coords.artifact_id, coords.version),
                payload: path.to_path_buf(),
                descriptor: sidecar_path(path),
            });

            match coords.kind {
                Kind::Plugin => {
                    let history = scan
                        .plugins
                        .entry(coords.artifact_id.clone())
                        .or_insert_with(|| PluginHistory::new(coords.artifact_id.clone()));
                    let artifact = ArtifactRef::new(
                        coords.artifact_id,
                        coords.group,
                        coords.version,
                        coords.extension,
                        handle,
                    );
                    let label = artifact.to_string();
                    if !history.add_artifact(artifact) {
                        tracing::debug!("duplicate release {} ignored", label);
                    }
                }
                Kind::Platform => {
                    scan.platform
                        .entry(coords.version.clone())
                        .or_insert_with(|| PlatformRelease::new(coords.version, handle));
                }
            }
        }

        tracing::debug!(
            "Scanned {}: {} plugins, {} platform releases",
            self.root.display(),
            scan.plugins.len(),
            scan.platform.len()
        );
        Ok(scan)
    }

    fn coordinates(&self, path: &Path) -> Option<Coordinates> {
        let extension = path.extension()?.to_str()?;
        let kind = if self.options.plugin_extensions.iter().any(|e| e == extension) {
            Kind::Plugin
        } else if self.options.platform_extension == extension {
            Kind::Platform
        } else {
            return None;
        };

        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        if parts.len() < 3 {
            return None;
        }
        let n = parts.len();
        let artifact_id = parts[n - 3];
        let version_dir = parts[n - 2];

        // classifier 等附属文件（foo-1.0-sources.hpi）不是主载荷
        let stem = path.file_stem()?.to_str()?;
        if stem != format!("{}-{}", artifact_id, version_dir) {
            tracing::debug!("skip non-primary file {}", path.display());
            return None;
        }

        let version = match Version::parse(version_dir) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("skip {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Coordinates {
            group: parts[..n - 3].join("."),
            artifact_id: artifact_id.to_string(),
            version,
            extension: extension.to_string(),
            kind,
        })
    }
}

impl PluginCatalog for FsCatalog {
    fn list_plugins(&self) -> Result<Vec<PluginHistory>, CatalogError> {
        Ok(self.scan()?.plugins.into_values().collect())
    }
}

impl PlatformCatalog for FsCatalog {
    fn list_platform_releases(&self) -> Result<BTreeMap<Version, PlatformRelease>, CatalogError> {
        Ok(self.scan()?.platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_tmp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("plugin-mirror-fs-{}-{}", tag, nanos))
    }

    fn put(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, body).unwrap();
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn sample_repo(tag: &str) -> PathBuf {
        let root = unique_tmp_dir(tag);
        put(&root, "org/example/plugins/foo/1.0/foo-1.0.hpi", "foo-1.0");
        put(
            &root,
            "org/example/plugins/foo/1.0/foo-1.0.toml",
            "required_platform = \"1.200\"\n",
        );
        put(&root, "org/example/plugins/foo/1.0/foo-1.0.pom", "<project/>");
        put(&root, "org/example/plugins/foo/1.0/foo-1.0-sources.hpi", "src");
        put(&root, "io/other/foo/1.1/foo-1.1.jpi", "foo-1.1");
        put(&root, "io/other/foo/1.1/foo-1.1.toml", "required_platform = \"1.300\"\n");
        put(&root, "org/example/plugins/bar/2.0/bar-2.0.hpi", "bar-2.0");
        put(&root, "org/example/plugins/bad/x..y/bad-x..y.hpi", "bad");
        put(
            &root,
            "org/example/main/platform-war/1.300/platform-war-1.300.war",
            "core",
        );
        put(
            &root,
            "org/example/main/platform-war/1.400/platform-war-1.400.war",
            "core",
        );
        root
    }

    #[test]
    fn discovers_plugins_across_groups() {
        let root = sample_repo("discover");
        let catalog = FsCatalog::open(&root, FsCatalogOptions::default()).unwrap();

        let plugins = catalog.list_plugins().unwrap();
        let ids: Vec<&str> = plugins.iter().map(|h| h.plugin_id.as_str()).collect();
        assert_eq!(ids, vec!["bar", "foo"]);

        let foo = &plugins[1];
        assert_eq!(foo.len(), 2);
        assert_eq!(foo.groups.len(), 2);
        assert!(foo.groups.contains("io.other"));
        assert!(foo.groups.contains("org.example.plugins"));
        assert_eq!(foo.artifacts()[&v("1.1")].extension, "jpi");
        assert_eq!(foo.artifacts()[&v("1.0")].extension, "hpi");
    }

    #[test]
    fn descriptors_are_read_lazily() {
        let root = sample_repo("lazy");
        let catalog = FsCatalog::open(&root, FsCatalogOptions::default()).unwrap();
        let plugins = catalog.list_plugins().unwrap();

        let foo = plugins.iter().find(|h| h.plugin_id == "foo").unwrap();
        assert_eq!(
            foo.artifacts()[&v("1.0")].required_platform_version().unwrap(),
            v("1.200")
        );

        // bar 没有描述文件：列出成功，读取失败
        let bar = plugins.iter().find(|h| h.plugin_id == "bar").unwrap();
        assert!(matches!(
            bar.latest().unwrap().required_platform_version(),
            Err(CatalogError::Descriptor { .. })
        ));
    }

    #[test]
    fn resolves_payload_paths() {
        let root = sample_repo("resolve");
        let catalog = FsCatalog::open(&root, FsCatalogOptions::default()).unwrap();
        let plugins = catalog.list_plugins().unwrap();
        let bar = plugins.iter().find(|h| h.plugin_id == "bar").unwrap();

        let path = catalog.resolve_artifact(bar.latest().unwrap()).unwrap();
        assert_eq!(path, root.join("org/example/plugins/bar/2.0/bar-2.0.hpi"));

        std::fs::remove_dir_all(root.join("org/example/plugins/bar/2.0")).unwrap();
        assert!(matches!(
            catalog.resolve_artifact(bar.latest().unwrap()),
            Err(CatalogError::Resolve { .. })
        ));
    }

    #[test]
    fn lists_platform_releases() {
        let root = sample_repo("platform");
        let catalog = FsCatalog::open(&root, FsCatalogOptions::default()).unwrap();
        let releases = catalog.list_platform_releases().unwrap();
        let versions: Vec<&str> = releases.keys().map(|k| k.as_str()).collect();
        assert_eq!(versions, vec!["1.300", "1.400"]);
    }

    #[test]
    fn keeps_versions_with_very_long_numbers() {
        let root = unique_tmp_dir("wide");
        let version = "2.0.99999999999999999999";
        put(
            &root,
            &format!("org/x/foo/{0}/foo-{0}.hpi", version),
            "foo-wide",
        );
        let catalog = FsCatalog::open(&root, FsCatalogOptions::default()).unwrap();

        let plugins = catalog.list_plugins().unwrap();
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].latest().unwrap().version.as_str(), version);
    }

    #[test]
    fn missing_root_is_unavailable() {
        let root = unique_tmp_dir("missing");
        assert!(matches!(
            FsCatalog::open(&root, FsCatalogOptions::default()),
            Err(CatalogError::Unavailable { .. })
        ));
    }
}
