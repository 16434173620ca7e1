// Prompt constants for the generation stage. Two variants exist; they
// differ only in the literal template text and column set.

use clap::ValueEnum;

/// Which output structure the prompt asks for and the parser expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ParseMode {
    /// One reason per line, bulleted list.
    List,
    /// Three comma-separated columns per line:
    /// negative reason, positive reframe, category.
    Csv,
}

/// Literal header labels the model is shown in the CSV example block.
/// The parser drops any line whose second field echoes this label.
pub const CSV_HEADER_NEGATIVE: &str = "ネガティブな転職理由";
pub const CSV_HEADER_POSITIVE: &str = "ポジティブな言い換え";
pub const CSV_HEADER_CATEGORY: &str = "カテゴリ";

/// Single-column variant: a plain bulleted list of reasons.
pub const LIST_PROMPT: &str = "
あなたは転職を希望する会社員です。
転職理由を箇条書きにしなさい。

### 出力する際のフォーマット
- 1行につき1つの転職理由を書くこと
- 日本語で回答を記述すること
- 10個から20個の転職理由を書くこと

### 禁止事項
- 同じ転職理由を書くことを禁ずる
";

/// Three-column variant: CSV with a positive reframe and a category.
pub const CSV_PROMPT: &str = "
あなたは転職を希望する会社員です。
転職理由を箇条書きにしなさい。

### 出力する際のフォーマット
- csv 形式で出力すること
- 日本語で回答を記述すること
- 10個から20個のネガティブな転職理由を書くこと
- ポジティブな言い換えを書くこと
- 転職理由をカテゴリ分類すること

### 出力フォーマットの例
```
ネガティブな転職理由,ポジティブな言い換え,カテゴリ
ネガティブな転職理由,ポジティブな言い換え,カテゴリ
ネガティブな転職理由,ポジティブな言い換え,カテゴリ
ネガティブな転職理由,ポジティブな言い換え,カテゴリ
```

### 禁止事項
- 同じ転職理由を書くことを禁ずる
";

/// Returns the fixed instruction text for the selected mode.
/// Pure and deterministic; no inputs beyond the mode.
pub fn build_prompt(mode: ParseMode) -> &'static str {
    match mode {
        ParseMode::List => LIST_PROMPT,
        ParseMode::Csv => CSV_PROMPT,
    }
}
