//! 相似度匹配：把模型给出的自由文本标签归到已知名称之一
//!
//! 相似度 = 1 - 编辑距离 / 较长串长度，比较前统一转大写；相同字符串得分 1.0。
//! 候选列表由调用方传入，不在这里写死。得分相同时取排在前面的候选。

/// Levenshtein 编辑距离（按字符）
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// 归一化相似度，范围 [0, 1]，对称
pub fn word_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_uppercase();
    let b = b.trim().to_uppercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(&a, &b) as f64 / max_len as f64
}

/// 返回得分最高的候选下标；只有严格更高的分数才会替换当前最佳，所以平分时前者胜出。
/// 候选为空时返回 None。
pub fn best_match<T: AsRef<str>>(input: &str, candidates: &[T]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let score = word_similarity(input, candidate.as_ref());
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}
