//! 规范记录摘要
//!
//! 规范记录先序列化为紧凑 JSON（键有序、无空白），再压缩为短的 base-36 文本。
//!
//! - `Wide`（默认）：SHA-256 截断到 64 位。
//! - `Legacy`：32 位滚动乘法哈希（`h = (h << 5) - h + c`，按 UTF-16 码元累加）。
//!   哈希空间小，规模上来后碰撞概率不可忽略：同一命名空间内两份不同输入
//!   可能得到同一摘要，从而返回错误的缓存结果。仅为兼容保留。

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::normalizer::CanonicalRecord;

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 摘要算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Wide,
    Legacy,
}

/// 计算规范记录的摘要
pub fn digest(record: &CanonicalRecord, algorithm: DigestAlgorithm) -> String {
    let text = record.to_canonical_json();
    match algorithm {
        DigestAlgorithm::Wide => wide_hash(&text),
        DigestAlgorithm::Legacy => legacy_hash(&text),
    }
}

/// SHA-256 前 8 字节，base-36 输出
pub fn wide_hash(text: &str) -> String {
    let hash = Sha256::digest(text.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash[..8]);
    to_base36(u64::from_be_bytes(prefix))
}

/// 32 位有符号滚动哈希，取绝对值后 base-36 输出
pub fn legacy_hash(text: &str) -> String {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    to_base36(u64::from(hash.unsigned_abs()))
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(BASE36_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
