use std::path::{Path, PathBuf};

/// Resolves config-relative paths against the directory holding the config.
#[derive(Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    pub fn new(config_path: &Path) -> Self {
        let base_dir = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Self { base_dir }
    }

    pub fn resolve(&self, p: &mut PathBuf) {
        if p.as_os_str().is_empty() || p.is_absolute() {
            return;
        }
        *p = self.join_clean(p);
    }

    fn join_clean(&self, rel: &Path) -> PathBuf {
        let joined = self.base_dir.join(rel);

        let mut out = PathBuf::new();
        for c in joined.components() {
            use std::path::Component::*;
            match c {
                CurDir => {}
                ParentDir => {
                    out.pop();
                }
                RootDir | Prefix(_) | Normal(_) => out.push(c.as_os_str()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_config_dir() {
        let r = PathResolver::new(Path::new("/work/bench/nl2sql.yaml"));
        let mut p = PathBuf::from("./data/../data/databases");
        r.resolve(&mut p);
        assert_eq!(p, PathBuf::from("/work/bench/data/databases"));
    }

    #[test]
    fn absolute_paths_untouched() {
        let r = PathResolver::new(Path::new("/work/bench/nl2sql.yaml"));
        let mut p = PathBuf::from("/srv/dbs");
        r.resolve(&mut p);
        assert_eq!(p, PathBuf::from("/srv/dbs"));
    }
}
