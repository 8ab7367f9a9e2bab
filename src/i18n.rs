use serde::Serialize;

use crate::models::Language;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Labels {
    pub app_name: &'static str,
    pub app_tagline: &'static str,
    pub option: &'static str,
    pub ai_analysis_label: &'static str,
    pub analysis_title: &'static str,
    pub detected: &'static str,
    pub flower_language_label: &'static str,
    pub blessing_label: &'static str,
    pub flower_selection: &'static str,
    pub palette: &'static str,
    pub generating_image: &'static str,
    pub designing_arrangement: &'static str,
    pub error_generic: &'static str,
    pub input_required: &'static str,
}

static EN: Labels = Labels {
    app_name: "Floral Harmony",
    app_tagline: "Find the perfect bloom for every moment.",
    option: "Option",
    ai_analysis_label: "AI Analysis",
    analysis_title: "Your Floral Story",
    detected: "Detected",
    flower_language_label: "Language of Flowers",
    blessing_label: "Blessing",
    flower_selection: "Flower Selection",
    palette: "Palette",
    generating_image: "Generating preview...",
    designing_arrangement: "Designing your arrangement...",
    error_generic: "Something went wrong while creating your arrangement. Please try again.",
    input_required: "Describe your occasion or upload a photo first.",
};

static ZH: Labels = Labels {
    app_name: "花语和鸣",
    app_tagline: "为每个时刻找到最美的花。",
    option: "方案",
    ai_analysis_label: "AI 分析",
    analysis_title: "你的花艺故事",
    detected: "识别到",
    flower_language_label: "花语",
    blessing_label: "祝福语",
    flower_selection: "花材清单",
    palette: "配色",
    generating_image: "正在生成预览图…",
    designing_arrangement: "正在为你设计花艺…",
    error_generic: "生成花艺方案时出错，请重试。",
    input_required: "请先描述你的需求或上传一张照片。",
};

pub fn labels(language: Language) -> &'static Labels {
    match language {
        Language::En => &EN,
        Language::Zh => &ZH,
    }
}
