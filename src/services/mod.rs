//! 进度引擎的业务服务
//!
//! 除 [`session`] 外都是纯函数：接收当前进度，返回新的进度。

pub mod activity;
pub mod badge;
pub mod dialogue;
pub mod report;
pub mod session;
pub mod settings;
pub mod streak;
pub mod tutor;
