use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;

const COMPARE_BUF: usize = 64 * 1024;

/// 目标文件的最终状态（两种落地方式都合法，硬链接只是优化）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Materialized {
    Linked,
    Copied,
    /// 目标已是同一文件，或是内容相同的旧副本
    Unchanged,
}

/// 把 `src` 落地到 `dst`：优先硬链接，任何链接失败（跨卷、不支持）都回退为完整拷贝
///
/// 只有拷贝失败才返回错误。重复执行不会改动已就绪的目标。
pub fn link_or_copy(src: &Path, dst: &Path) -> io::Result<Materialized> {
    link_or_copy_with(src, dst, |s, d| fs::hard_link(s, d))
}

fn link_or_copy_with(
    src: &Path,
    dst: &Path,
    link: fn(&Path, &Path) -> io::Result<()>,
) -> io::Result<Materialized> {
    if let Ok(existing) = fs::symlink_metadata(dst) {
        if is_same_file(src, dst) {
            return Ok(Materialized::Unchanged);
        }
        if existing.is_file() && same_contents(src, dst)? {
            return Ok(Materialized::Unchanged);
        }
        // 过期条目：先移除，否则 hard_link/copy 会撞上已存在的目标
        fs::remove_file(dst)?;
    }

    if let Some(parent) = dst.parent() {
        // 多个 worker 可能同时创建同一父目录，已存在不算错误
        fs::create_dir_all(parent)?;
    }

    match link(src, dst) {
        Ok(()) => Ok(Materialized::Linked),
        Err(e) => {
            tracing::debug!(
                "hard link {} -> {} failed ({}), copying",
                src.display(),
                dst.display(),
                e
            );
            fs::copy(src, dst)?;
            Ok(Materialized::Copied)
        }
    }
}

#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(ma), Ok(mb)) => ma.dev() == mb.dev() && ma.ino() == mb.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}

fn same_contents(a: &Path, b: &Path) -> io::Result<bool> {
    let fa = File::open(a)?;
    let fb = File::open(b)?;
    if fa.metadata()?.len() != fb.metadata()?.len() {
        return Ok(false);
    }

    let mut ra = BufReader::with_capacity(COMPARE_BUF, fa);
    let mut rb = BufReader::with_capacity(COMPARE_BUF, fb);
    loop {
        let ba = ra.fill_buf()?;
        let bb = rb.fill_buf()?;
        if ba.is_empty() || bb.is_empty() {
            return Ok(ba.is_empty() && bb.is_empty());
        }
        let n = ba.len().min(bb.len());
        if ba[..n] != bb[..n] {
            return Ok(false);
        }
        ra.consume(n);
        rb.consume(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn unique_tmp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("plugin-mirror-mat-{}-{}", tag, nanos))
    }

    #[test]
    fn links_into_missing_parents() {
        let dir = unique_tmp_dir("link");
        std::fs::create_dir_all(&dir).unwrap();
        let src = dir.join("src.hpi");
        std::fs::write(&src, b"payload").unwrap();
        let dst = dir.join("out/foo/1.0/foo.hpi");

        assert_eq!(link_or_copy(&src, &dst).unwrap(), Materialized::Linked);
        assert_eq!(std::fs::read(&dst).unwrap(), b"payload");
        assert!(is_same_file(&src, &dst));
    }

    #[test]
    fn second_run_is_a_no_op() {
        let dir = unique_tmp_dir("rerun");
        std::fs::create_dir_all(&dir).unwrap();
        let src = dir.join("src.hpi");
        std::fs::write(&src, b"payload").unwrap();
        let dst = dir.join("out/foo.hpi");

        link_or_copy(&src, &dst).unwrap();
        assert_eq!(link_or_copy(&src, &dst).unwrap(), Materialized::Unchanged);
    }

    #[test]
    fn identical_copy_is_left_alone() {
        let dir = unique_tmp_dir("copy-same");
        std::fs::create_dir_all(dir.join("out")).unwrap();
        let src = dir.join("src.hpi");
        std::fs::write(&src, b"payload").unwrap();
        let dst = dir.join("out/foo.hpi");
        std::fs::write(&dst, b"payload").unwrap();
        let before = std::fs::metadata(&dst).unwrap().modified().unwrap();

        assert_eq!(link_or_copy(&src, &dst).unwrap(), Materialized::Unchanged);
        assert_eq!(std::fs::metadata(&dst).unwrap().modified().unwrap(), before);
        assert!(!is_same_file(&src, &dst));
    }

    #[test]
    fn stale_destination_is_replaced() {
        let dir = unique_tmp_dir("stale");
        std::fs::create_dir_all(dir.join("out")).unwrap();
        let src = dir.join("src.hpi");
        std::fs::write(&src, b"new payload").unwrap();
        let dst = dir.join("out/foo.hpi");
        std::fs::write(&dst, b"old").unwrap();

        assert_eq!(link_or_copy(&src, &dst).unwrap(), Materialized::Linked);
        assert_eq!(std::fs::read(&dst).unwrap(), b"new payload");
    }

    #[test]
    fn failed_link_falls_back_to_copy() {
        let dir = unique_tmp_dir("fallback");
        std::fs::create_dir_all(&dir).unwrap();
        let src = dir.join("src.hpi");
        std::fs::write(&src, b"cross-device payload").unwrap();
        let dst = dir.join("out/foo/1.0/foo.hpi");

        let cross_device: fn(&Path, &Path) -> io::Result<()> =
            |_, _| Err(io::Error::new(io::ErrorKind::Other, "cross-device link"));
        assert_eq!(
            link_or_copy_with(&src, &dst, cross_device).unwrap(),
            Materialized::Copied
        );
        assert_eq!(std::fs::read(&dst).unwrap(), b"cross-device payload");
        assert!(!is_same_file(&src, &dst));

        // 再次执行：内容相同的副本保持不动
        assert_eq!(
            link_or_copy_with(&src, &dst, cross_device).unwrap(),
            Materialized::Unchanged
        );
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = unique_tmp_dir("missing");
        std::fs::create_dir_all(&dir).unwrap();
        assert!(link_or_copy(&dir.join("absent"), &dir.join("out/x")).is_err());
    }

    #[test]
    fn same_contents_detects_differences() {
        let dir = unique_tmp_dir("cmp");
        std::fs::create_dir_all(&dir).unwrap();
        let a = dir.join("a");
        let b = dir.join("b");
        let big: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&a, &big).unwrap();
        std::fs::write(&b, &big).unwrap();
        assert!(same_contents(&a, &b).unwrap());

        let mut changed = big.clone();
        changed[150_000] ^= 0xff;
        std::fs::write(&b, &changed).unwrap();
        assert!(!same_contents(&a, &b).unwrap());
    }
}
