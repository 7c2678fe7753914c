//! JSON Schema + Markdown生成ツール
//!
//! src/domain/config.rsの設定構造から以下を自動生成します：
//! 1. JSON Schema (schema/config.json)
//! 2. Markdownドキュメント (CONFIGURATION.md)
//!
//! 実行方法:
//! ```
//! cargo run --bin generate_schema
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::fs;
use SayCheese::domain::config::AppConfig;

fn main() {
    println!("JSON Schema + Markdown生成中...");

    let schema = schema_for!(AppConfig);
    let json = serde_json::to_string_pretty(&schema).expect("Failed to serialize schema to JSON");

    fs::create_dir_all("schema").expect("Failed to create schema/ directory");
    fs::write("schema/config.json", &json).expect("Failed to write schema/config.json");
    println!("  ✓ schema/config.json");

    let schema_value: Value =
        serde_json::from_str(&json).expect("Failed to parse generated schema");
    let markdown = generate_markdown(&schema_value);

    fs::write("CONFIGURATION.md", markdown).expect("Failed to write CONFIGURATION.md");
    println!("  ✓ CONFIGURATION.md");

    println!("✅ 生成完了: schema/config.json + CONFIGURATION.md");
}

/// JSON Schemaからマークダウンドキュメントを生成
fn generate_markdown(schema: &Value) -> String {
    let mut md = String::new();

    md.push_str("# 設定リファレンス (Configuration Reference)\n\n");
    md.push_str("## 概要\n\n");
    md.push_str("`config.toml`ファイルは、SayCheeseの動作を制御する設定ファイルです。\n\n");
    md.push_str("**設定ファイルの場所**: `config.toml` (プロジェクトルート)  \n");
    md.push_str("**スキーマファイル**: `schema/config.json` (自動生成)  \n");
    md.push_str("**サンプル**: `config.toml.example`\n\n");
    md.push_str("⚠️ **注意**: このドキュメント（CONFIGURATION.md）は `cargo run --bin generate_schema` で自動生成されます。\n");
    md.push_str("設定項目の説明を変更する場合は、`src/domain/config.rs`のdoc commentsを編集してください。\n\n");
    md.push_str("## 設定ファイルの読み込み\n\n");
    md.push_str("- `config.toml`が存在する場合: ファイルから読み込み\n");
    md.push_str("- ファイルが存在しないかパースに失敗した場合: デフォルト値を使用（警告ログ出力）\n\n");
    md.push_str("## 設定項目\n\n");

    let defs = schema
        .get("$defs")
        .and_then(|d| d.as_object())
        .cloned()
        .unwrap_or_default();

    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, prop) in props {
            md.push_str(&format!("### [{}] - {}\n\n", key, format_section_name(key)));

            if let Some(desc) = prop.get("description").and_then(|d| d.as_str()) {
                md.push_str(&format!("{}\n\n", desc));
            }

            // セクションは$refで定義側を参照する
            if let Some(def_name) = prop
                .get("$ref")
                .and_then(|r| r.as_str())
                .and_then(|r| r.strip_prefix("#/$defs/"))
            {
                if let Some(def_schema) = defs.get(def_name) {
                    generate_properties_table(&mut md, def_schema);
                }
            }
        }
    }

    md.push_str("## 参考\n\n");
    md.push_str("- [README.md](README.md) - クイックスタート\n");

    md
}

/// プロパティテーブルを生成
fn generate_properties_table(md: &mut String, schema: &Value) {
    let props = match schema.get("properties").and_then(|p| p.as_object()) {
        Some(props) if !props.is_empty() => props,
        _ => return,
    };

    md.push_str("| 設定項目 | 型 | デフォルト | 説明 |\n");
    md.push_str("|---------|-----|---------|---------|\n");

    for (prop_key, prop_schema) in props {
        md.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            prop_key,
            get_type_string(prop_schema).replace('|', "\\|"),
            get_default_value(prop_schema),
            get_description(prop_schema)
        ));
    }
    md.push('\n');
}

/// 型を文字列で取得
fn get_type_string(schema: &Value) -> String {
    match schema.get("type") {
        Some(Value::String(type_str)) => match type_str.as_str() {
            "integer" | "number" => schema
                .get("format")
                .and_then(|f| f.as_str())
                .unwrap_or(type_str)
                .to_string(),
            "boolean" => "bool".to_string(),
            other => other.to_string(),
        },
        // Optionフィールドは ["string", "null"] のようなunion型になる
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" | "),
        _ => "unknown".to_string(),
    }
}

/// デフォルト値を取得
fn get_default_value(schema: &Value) -> String {
    match schema.get("default") {
        Some(Value::String(s)) => format!("`\"{}\"`", s),
        Some(Value::Number(n)) => format!("`{}`", n),
        Some(Value::Bool(b)) => format!("`{}`", b),
        Some(Value::Null) => "`null`".to_string(),
        _ => "-".to_string(),
    }
}

/// 説明文を取得
fn get_description(schema: &Value) -> String {
    match schema.get("description").and_then(|d| d.as_str()) {
        Some(desc) => desc
            .replace("\n\n", "<br><br>")
            .replace('\n', " ")
            .replace('|', "\\|"),
        None => "-".to_string(),
    }
}

/// セクション名をフォーマット
fn format_section_name(key: &str) -> String {
    match key {
        "capture" => "キャプチャ設定".to_string(),
        "classifier" => "分類（推論）設定".to_string(),
        "logging" => "ログ設定".to_string(),
        _ => key.to_string(),
    }
}
