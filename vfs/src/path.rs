//! 路径处理

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;

pub trait Path: ToOwned {
    fn is_absolute(&self) -> bool;

    /// 返回以`/`开头、不以`/`结束(根目录除外)、不包含`.`与`..`的绝对路径。
    ///
    /// 相对路径视作相对于`cwd`，`cwd`须为绝对路径。
    /// `..`越过根目录时返回`None`。
    fn canonicalize(&self, cwd: &Self) -> Option<Self::Owned>;

    /// 返回路径的`(父目录, 文件名)`，根目录返回`None`。
    ///
    /// 仅适用于规范化后的绝对路径。
    fn parent_file(&self) -> Option<(&Self, &Self)>;

    /// 按`/`切分后的非空路径项
    fn components(&self) -> impl Iterator<Item = &Self>;

    /// `self`是否为`ancestor`本身或位于其下
    fn starts_with_path(&self, ancestor: &Self) -> bool;

    fn is_relative(&self) -> bool {
        !self.is_absolute()
    }
}

impl Path for str {
    fn is_absolute(&self) -> bool {
        self.starts_with('/')
    }

    fn canonicalize(&self, cwd: &Self) -> Option<Self::Owned> {
        let mut cmps = Vec::new();
        if self.is_relative() {
            cmps.extend(cwd.components());
        }

        for cmp in self.components() {
            match cmp {
                ".." => {
                    cmps.pop()?;
                }
                "." => (),
                s => cmps.push(s),
            }
        }

        if cmps.is_empty() {
            return Some(String::from("/"));
        }
        cmps.insert(0, ""); // 在接下来的拼接中代表根目录

        Some(cmps.join("/"))
    }

    fn parent_file(&self) -> Option<(&Self, &Self)> {
        if self == "/" {
            return None;
        }

        self.trim_end_matches('/')
            .rsplit_once('/')
            .map(|(p, f)| if p.is_empty() { ("/", f) } else { (p, f) })
    }

    fn components(&self) -> impl Iterator<Item = &Self> {
        self.split('/').filter(|s| !s.is_empty())
    }

    fn starts_with_path(&self, ancestor: &Self) -> bool {
        let mut cmps = self.components();
        ancestor.components().all(|a| cmps.next() == Some(a))
    }
}

#[cfg(test)]
mod tests {
    use super::Path;

    #[test]
    fn canonicalize() {
        assert_eq!("/".canonicalize("/").as_deref(), Some("/"));
        assert_eq!("a/b".canonicalize("/").as_deref(), Some("/a/b"));
        assert_eq!("/a//b/./c/..".canonicalize("/").as_deref(), Some("/a/b"));
        assert_eq!("../x".canonicalize("/usr/bin").as_deref(), Some("/usr/x"));
        assert_eq!("/..".canonicalize("/"), None);
    }

    #[test]
    fn parent_file() {
        assert_eq!("/".parent_file(), None);
        assert_eq!("/a".parent_file(), Some(("/", "a")));
        assert_eq!("/a/b/c".parent_file(), Some(("/a/b", "c")));
    }

    #[test]
    fn starts_with_path() {
        assert!("/a/b".starts_with_path("/a"));
        assert!("/a".starts_with_path("/a"));
        assert!(!"/ab".starts_with_path("/a"));
        assert!("/x".starts_with_path("/"));
    }
}
