//! 时间线规整
//!
//! 把无序的事件整理成按时间倒序、带状态分类的展示序列

use crate::consult::error::ConsultResult;
use crate::consult::remote::Row;
use crate::consult::timeline::models::{StatusBucket, TimelineEntry, TimelineEvent, TimelineEventRow, TimelineView};
use crate::consult::types::parse_row;
use tracing::debug;

/// 按时间倒序排列并分类
///
/// 使用稳定排序：时间相同的事件保持输入顺序。空输入返回 `NoEvents`。
pub fn normalize(mut events: Vec<TimelineEvent>) -> TimelineView {
    if events.is_empty() {
        return TimelineView::NoEvents;
    }
    events.sort_by(|a, b| b.date.cmp(&a.date));
    let entries: Vec<TimelineEntry> = events
        .into_iter()
        .map(|event| TimelineEntry {
            bucket: StatusBucket::classify(&event.status),
            event,
        })
        .collect();
    debug!("[Timeline] 规整完成，事件数: {}", entries.len());
    TimelineView::Events(entries)
}

/// 从原始行解析并规整；任一行不合法时整体返回校验错误
pub fn normalize_rows(rows: Vec<Row>) -> ConsultResult<TimelineView> {
    let events = rows
        .into_iter()
        .map(|row| -> ConsultResult<TimelineEvent> {
            parse_row::<TimelineEventRow>(row, "时间线事件")?.try_into()
        })
        .collect::<ConsultResult<Vec<TimelineEvent>>>()?;
    Ok(normalize(events))
}
