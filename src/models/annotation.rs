use crate::models::schema::{fields, AnnotationItem};
use std::collections::BTreeMap;

/// 单条日记的标注结果
///
/// 始终包含全部标注项；模型额外返回的键会被保留，但调用方不依赖它们
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationResult {
    values: BTreeMap<String, String>,
}

impl AnnotationResult {
    /// 全部标注项为空的结果
    pub fn empty() -> Self {
        Self {
            values: fields().map(|name| (name.to_string(), String::new())).collect(),
        }
    }

    /// 由任意键值对构建，缺失的标注项补为空字符串
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut values: BTreeMap<String, String> = pairs.into_iter().collect();
        for name in fields() {
            values.entry(name.to_string()).or_default();
        }
        Self { values }
    }

    /// 取某个标注项的值
    pub fn get(&self, item: AnnotationItem) -> &str {
        self.values.get(item.name()).map(String::as_str).unwrap_or_default()
    }

    /// 按键名取值（包括额外的键）
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// 按输出列顺序排列的标注值
    pub fn row(&self) -> Vec<&str> {
        AnnotationItem::ALL.iter().map(|item| self.get(*item)).collect()
    }

    /// 所有标注项都为空
    pub fn is_blank(&self) -> bool {
        AnnotationItem::ALL.iter().all(|item| self.get(*item).is_empty())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl Default for AnnotationResult {
    fn default() -> Self {
        Self::empty()
    }
}
