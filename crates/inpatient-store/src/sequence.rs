//! 住院序列号生成

use inpatient_core::utils::format_sequence_code;
use inpatient_core::SequenceGenerator;
use serde::{Deserialize, Serialize};

/// 前缀 + 补零计数器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixedSequence {
    prefix: String,
    padding: usize,
    next_number: u64,
}

impl PrefixedSequence {
    pub fn new(prefix: &str, padding: usize) -> Self {
        Self {
            prefix: prefix.to_string(),
            padding,
            next_number: 1,
        }
    }

    /// 更新前缀和位数，保留计数器
    pub fn configure(&mut self, prefix: &str, padding: usize) {
        self.prefix = prefix.to_string();
        self.padding = padding;
    }

    pub fn peek_number(&self) -> u64 {
        self.next_number
    }
}

impl Default for PrefixedSequence {
    fn default() -> Self {
        Self::new("IP", 5)
    }
}

impl SequenceGenerator for PrefixedSequence {
    fn next_code(&mut self) -> String {
        let code = format_sequence_code(&self.prefix, self.next_number, self.padding);
        self.next_number += 1;
        code
    }
}
