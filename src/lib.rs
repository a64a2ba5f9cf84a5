pub mod consult;

// 重新导出常用类型和函数，方便外部使用
pub use consult::{
    client::ConsultClient,
    config::{ClientConfig, Language, Preferences, Theme},
    error::{ConsultError, ConsultResult},
    login_async,
};
