//! Class 名合并
//!
//! `cn!` = 条件片段拼接（clsx）+ utility 冲突合并（后者覆盖前者）

mod merge;

pub use merge::merge_classes;

/// 可以贡献 class 名的片段
///
/// `None`、`(_, false)`、空字符串都不产生任何 class；
/// 切片、数组、`Vec` 递归展开。
pub trait ClassFragment {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a str>);
}

impl ClassFragment for str {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.extend(self.split_whitespace());
    }
}

impl ClassFragment for String {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a str>) {
        self.as_str().collect_into(out);
    }
}

impl<T: ClassFragment + ?Sized> ClassFragment for &T {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a str>) {
        (**self).collect_into(out);
    }
}

impl<T: ClassFragment> ClassFragment for Option<T> {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(fragment) = self {
            fragment.collect_into(out);
        }
    }
}

/// `("active", is_active)` 形式的条件 class
impl<T: ClassFragment> ClassFragment for (T, bool) {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a str>) {
        if self.1 {
            self.0.collect_into(out);
        }
    }
}

impl<T: ClassFragment> ClassFragment for [T] {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a str>) {
        for fragment in self {
            fragment.collect_into(out);
        }
    }
}

impl<T: ClassFragment, const N: usize> ClassFragment for [T; N] {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a str>) {
        self.as_slice().collect_into(out);
    }
}

impl<T: ClassFragment> ClassFragment for Vec<T> {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a str>) {
        self.as_slice().collect_into(out);
    }
}

/// 展开片段为空格分隔的 class 列表，不做冲突合并
pub fn class_list(fragments: &[&dyn ClassFragment]) -> String {
    let mut classes = Vec::new();
    for fragment in fragments {
        fragment.collect_into(&mut classes);
    }
    classes.join(" ")
}

/// 展开并合并片段
pub fn cn(fragments: &[&dyn ClassFragment]) -> String {
    merge_classes(&class_list(fragments))
}

/// 可变参数形式的 [`cn`]
///
/// ```
/// use audit_kit::cn;
///
/// let active = true;
/// assert_eq!(cn!("px-2 py-1", ("bg-primary", active), None::<&str>, "p-4"), "bg-primary p-4");
/// ```
#[macro_export]
macro_rules! cn {
    ($($fragment:expr),* $(,)?) => {
        $crate::class_names::cn(&[$(&$fragment as &dyn $crate::class_names::ClassFragment),*])
    };
}
