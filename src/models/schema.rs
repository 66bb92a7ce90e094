//! 日记标注项目
//!
//! 七个标注项的名称与顺序在编译期固定，输出列顺序即此顺序

/// 日记标注项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationItem {
    /// 情感正向
    PositiveEmotion,
    /// 情感负向
    NegativeEmotion,
    /// 情感中立
    NeutralEmotion,
    /// 积极行为
    ProactiveBehavior,
    /// 消极行为
    PassiveBehavior,
    /// 反思
    Reflection,
    /// 目标设置
    GoalSetting,
}

impl AnnotationItem {
    /// 全部标注项（按输出列顺序）
    pub const ALL: [AnnotationItem; 7] = [
        AnnotationItem::PositiveEmotion,
        AnnotationItem::NegativeEmotion,
        AnnotationItem::NeutralEmotion,
        AnnotationItem::ProactiveBehavior,
        AnnotationItem::PassiveBehavior,
        AnnotationItem::Reflection,
        AnnotationItem::GoalSetting,
    ];

    /// 与模型约定的字段名
    pub fn name(self) -> &'static str {
        match self {
            AnnotationItem::PositiveEmotion => "情感正向",
            AnnotationItem::NegativeEmotion => "情感負向",
            AnnotationItem::NeutralEmotion => "情感中立",
            AnnotationItem::ProactiveBehavior => "積極行為",
            AnnotationItem::PassiveBehavior => "消極行為",
            AnnotationItem::Reflection => "反思",
            AnnotationItem::GoalSetting => "目標設置",
        }
    }

    /// 从字段名解析
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|item| item.name() == name)
    }
}

impl std::fmt::Display for AnnotationItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 有序字段名列表
pub fn fields() -> impl Iterator<Item = &'static str> + Clone {
    AnnotationItem::ALL.into_iter().map(AnnotationItem::name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fields_are_ordered_and_unique() {
        let names: Vec<_> = fields().collect();
        assert_eq!(names.len(), 7);
        assert_eq!(names[0], "情感正向");
        assert_eq!(names[6], "目標設置");
        assert_eq!(names.iter().collect::<HashSet<_>>().len(), 7);
    }

    #[test]
    fn test_from_name_round_trips() {
        for item in AnnotationItem::ALL {
            assert_eq!(AnnotationItem::from_name(item.name()), Some(item));
        }
        assert_eq!(AnnotationItem::from_name("心情"), None);
    }
}
