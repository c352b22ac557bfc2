use chrono::NaiveDate;

use crate::storage::StreakData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// 第一次活动
    Started,
    /// 今天已经记过
    Unchanged,
    /// 昨天也学了
    Extended,
    /// 中断（间隔超过一天或日期倒退）
    Reset,
}

pub fn classify(streak: &StreakData, today: NaiveDate) -> StreakChange {
    match streak.last_activity_date {
        None => StreakChange::Started,
        Some(last) if last == today => StreakChange::Unchanged,
        Some(last) => {
            if (today - last).num_days() == 1 {
                StreakChange::Extended
            } else {
                StreakChange::Reset
            }
        }
    }
}

/// 计算今天活动之后的连续天数
///
/// 同一天重复调用结果不变。除 `Unchanged` 外都会把
/// `last_activity_date` 设为今天。
pub fn update_streak(streak: &StreakData, today: NaiveDate) -> StreakData {
    let change = classify(streak, today);
    let mut next = streak.clone();

    match change {
        StreakChange::Unchanged => return next,
        StreakChange::Started | StreakChange::Reset => next.current_streak = 1,
        StreakChange::Extended => next.current_streak = next.current_streak.saturating_add(1),
    }

    next.longest_streak = next.longest_streak.max(next.current_streak);
    next.last_activity_date = Some(today);

    tracing::debug!(
        change = ?change,
        current = next.current_streak,
        longest = next.longest_streak,
        "streak updated"
    );
    next
}
