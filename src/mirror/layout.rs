use std::path::{Path, PathBuf};

use crate::core::ArtifactRef;
use crate::mirror::MirrorError;

/// 镜像目录布局：`<root>/<pluginId>/<version>/<pluginId>.<ext>`
///
/// 每个 (插件, 版本) 对应唯一路径，因此不同插件任务之间不会写同一个文件。
#[derive(Clone, Debug)]
pub struct MirrorLayout {
    root: PathBuf,
}

impl MirrorLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn destination(&self, artifact: &ArtifactRef) -> Result<PathBuf, MirrorError> {
        let id = safe_component("plugin id", &artifact.plugin_id)?;
        let version = safe_component("version", artifact.version.as_str())?;
        let ext = safe_component("extension", &artifact.extension)?;
        Ok(self
            .root
            .join(id)
            .join(version)
            .join(format!("{}.{}", id, ext)))
    }
}

/// 必须是单个普通路径段，不能跳出镜像根目录
fn safe_component<'a>(kind: &'static str, value: &'a str) -> Result<&'a str, MirrorError> {
    let unsafe_value = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0', ':']);
    if unsafe_value {
        return Err(MirrorError::UnsafePath {
            kind,
            value: value.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::StaticHandle;
    use crate::core::Version;

    fn artifact(id: &str, version: &str, ext: &str) -> ArtifactRef {
        ArtifactRef::new(
            id,
            "org.example",
            Version::parse(version).unwrap(),
            ext,
            StaticHandle::unreadable(),
        )
    }

    #[test]
    fn destination_is_namespaced_by_plugin_and_version() {
        let layout = MirrorLayout::new("/srv/mirror");
        assert_eq!(
            layout.destination(&artifact("foo", "1.0-beta", "hpi")).unwrap(),
            PathBuf::from("/srv/mirror/foo/1.0-beta/foo.hpi")
        );
    }

    #[test]
    fn rejects_components_escaping_root() {
        let layout = MirrorLayout::new("/srv/mirror");
        for id in ["", ".", "..", "a/b", "a\\b", "c:evil"] {
            assert!(
                matches!(
                    layout.destination(&artifact(id, "1.0", "hpi")),
                    Err(MirrorError::UnsafePath { kind: "plugin id", .. })
                ),
                "id {:?} accepted",
                id
            );
        }
        assert!(matches!(
            layout.destination(&artifact("foo", "1.0", "../x")),
            Err(MirrorError::UnsafePath { kind: "extension", .. })
        ));
    }
}
