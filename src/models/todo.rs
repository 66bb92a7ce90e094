use serde::{Deserialize, Serialize};

/// 待办事项文件的表头
pub const TODO_HEADERS: [&str; 4] = ["任務名稱", "截止時間", "重要性", "狀態"];

/// 待办事项的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRow {
    #[serde(rename = "任務名稱", default)]
    pub task_name: String,
    #[serde(rename = "截止時間", default)]
    pub deadline: String,
    #[serde(rename = "重要性", default)]
    pub importance: String,
    #[serde(rename = "狀態", default)]
    pub status: String,
}

impl TodoRow {
    /// 以表头为键的 JSON 对象，供提示词使用
    pub fn to_json(&self) -> serde_json::Value {
        let values = [
            &self.task_name,
            &self.deadline,
            &self.importance,
            &self.status,
        ];
        let map: serde_json::Map<String, serde_json::Value> = TODO_HEADERS
            .iter()
            .zip(values)
            .map(|(key, value)| (key.to_string(), serde_json::Value::from(value.as_str())))
            .collect();
        serde_json::Value::Object(map)
    }
}
