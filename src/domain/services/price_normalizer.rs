// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 价格规范化
///
/// 把任意地区格式的价格展示文本解析为数值：
/// 1. 去掉除数字、`.`、`,` 之外的所有字符
/// 2. 把所有 `,` 替换为 `.`
/// 3. 把除最后一个 `.` 之外的点全部去掉（视为千位分隔符）
/// 4. 按浮点数解析
///
/// 解析失败、NaN 或结果恰好为零（选择器抓到占位文本的典型症状）
/// 都返回 None。纯函数，无副作用。
///
/// # 参数
///
/// * `raw` - 原始价格文本，例如 `"€1.234,56"`
///
/// # 返回值
///
/// * `Some(f64)` - 规范化后的价格
/// * `None` - 文本不含有效的非零数值
pub fn normalize_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    let dotted = cleaned.replace(',', ".");
    let collapsed = remove_dots_except_last(&dotted);

    match collapsed.parse::<f64>() {
        Ok(value) if value.is_nan() || value == 0.0 => None,
        Ok(value) => Some(value),
        Err(_) => None,
    }
}

/// 去掉除最后一个点之外的所有点
fn remove_dots_except_last(s: &str) -> String {
    match s.rfind('.') {
        None => s.to_string(),
        Some(last) => {
            let mut out: String = s[..last].chars().filter(|c| *c != '.').collect();
            out.push_str(&s[last..]);
            out
        }
    }
}
