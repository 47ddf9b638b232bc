use std::fmt::{Display, Formatter};

use serde::Deserialize;

/// 分型/标记极性：G 顶，D 底。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    G,
    D,
}

impl Mark {
    pub fn opposite(self) -> Self {
        match self {
            Self::G => Self::D,
            Self::D => Self::G,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::G => "g",
            Self::D => "d",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// 笔的计数口径：old 用合并K线，new 用原始K线。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiMode {
    #[default]
    Old,
    New,
}

/// 力度/背驰的分段口径。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerMode {
    Bi,
    Xd,
}

/// `get_sub_section` 的目标层。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionMode {
    Kn,
    Fx,
    Bi,
    Xd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Freq {
    M1,
    M5,
    M15,
    M30,
    M60,
    D1,
    W1,
}

impl Freq {
    pub const ALL: [Freq; 7] = [
        Freq::M1,
        Freq::M5,
        Freq::M15,
        Freq::M30,
        Freq::M60,
        Freq::D1,
        Freq::W1,
    ];

    /// 级别中文名，同时用作该级别分析器的名称与信号前缀。
    pub fn label(self) -> &'static str {
        match self {
            Self::M1 => "1分钟",
            Self::M5 => "5分钟",
            Self::M15 => "15分钟",
            Self::M30 => "30分钟",
            Self::M60 => "60分钟",
            Self::D1 => "日线",
            Self::W1 => "周线",
        }
    }

    /// 分钟级别的桶宽；日线/周线返回 None。
    pub fn minutes(self) -> Option<u32> {
        match self {
            Self::M1 => Some(1),
            Self::M5 => Some(5),
            Self::M15 => Some(15),
            Self::M30 => Some(30),
            Self::M60 => Some(60),
            Self::D1 | Self::W1 => None,
        }
    }

    pub fn parse(value: &str) -> Result<Self, AnalyzeError> {
        match value.trim() {
            "1分钟" | "1m" => Ok(Self::M1),
            "5分钟" | "5m" => Ok(Self::M5),
            "15分钟" | "15m" => Ok(Self::M15),
            "30分钟" | "30m" => Ok(Self::M30),
            "60分钟" | "60m" | "1h" => Ok(Self::M60),
            "日线" | "1d" => Ok(Self::D1),
            "周线" | "1w" => Ok(Self::W1),
            _ => Err(AnalyzeError::InvalidFreq(value.to_string())),
        }
    }
}

pub struct Const;

impl Const {
    /// 分型缺口判定阈值。
    pub const MIN_GAP: f64 = 0.002;
    /// 增量合并时回看的原始K线数量。
    pub const MERGE_LOOKBACK: usize = 100;
    /// 增量分型扫描时回看的合并K线数量。
    pub const FX_LOOKBACK: usize = 100;
    /// 增量笔扫描时回看的分型数量。
    pub const BI_FX_LOOKBACK: usize = 50;
    /// 增量笔扫描时回看的K线数量。
    pub const BI_BAR_LOOKBACK: usize = 300;
    /// 增量线段扫描时回看的笔标记数量。
    pub const XD_BI_LOOKBACK: usize = 200;
    /// MACD 增量计算的尾部窗口。
    pub const MACD_TAIL: usize = 200;
}

#[derive(Debug)]
pub enum AnalyzeError {
    Precondition(String),
    Structural(String),
    InvalidFreq(String),
    InvalidDatetime(String),
    Io(std::io::Error),
    Csv(csv::Error),
    Yaml(serde_yaml::Error),
}

impl Display for AnalyzeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Precondition(v) => write!(f, "precondition violated: {v}"),
            Self::Structural(v) => write!(f, "structural assertion failed: {v}"),
            Self::InvalidFreq(v) => write!(f, "invalid freq: {v}"),
            Self::InvalidDatetime(v) => write!(f, "invalid datetime: {v}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Csv(e) => write!(f, "csv error: {e}"),
            Self::Yaml(e) => write!(f, "yaml error: {e}"),
        }
    }
}

impl std::error::Error for AnalyzeError {}

impl From<std::io::Error> for AnalyzeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for AnalyzeError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_yaml::Error> for AnalyzeError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}
