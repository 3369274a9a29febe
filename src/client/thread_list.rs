use chrono::{DateTime, Utc};

use crate::client::recency::RecencyBucket;
use crate::models::{Thread, ThreadId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadGroup {
    pub bucket: RecencyBucket,
    pub threads: Vec<Thread>,
}

/// One line of the rendered side panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadRow {
    Header(&'static str),
    Entry {
        id: ThreadId,
        title: String,
        focused: bool,
        /// Delete affordance; only revealed on the highlighted entry.
        show_delete: bool,
    },
}

/// Groups threads by recency. Empty buckets are dropped; backend order is kept inside a bucket.
pub fn group_threads(threads: &[Thread], now: DateTime<Utc>) -> Vec<ThreadGroup> {
    RecencyBucket::ALL
        .iter()
        .filter_map(|bucket| {
            let members: Vec<Thread> = threads
                .iter()
                .filter(|t| RecencyBucket::classify(t.created_at, now) == *bucket)
                .cloned()
                .collect();
            (!members.is_empty()).then(|| ThreadGroup {
                bucket: *bucket,
                threads: members,
            })
        })
        .collect()
}

pub fn build_rows(
    groups: &[ThreadGroup],
    focused: ThreadId,
    highlighted: Option<ThreadId>,
) -> Vec<ThreadRow> {
    let mut rows = Vec::new();
    for group in groups {
        rows.push(ThreadRow::Header(group.bucket.label()));
        for thread in &group.threads {
            rows.push(ThreadRow::Entry {
                id: thread.id,
                title: thread.title.clone(),
                focused: thread.id == focused,
                show_delete: Some(thread.id) == highlighted,
            });
        }
    }
    rows
}

/// Last successfully rendered thread list.
#[derive(Debug, Clone, Default)]
pub struct ThreadList {
    groups: Vec<ThreadGroup>,
}

impl ThreadList {
    pub fn replace(&mut self, threads: &[Thread], now: DateTime<Utc>) {
        self.groups = group_threads(threads, now);
    }

    pub fn groups(&self) -> &[ThreadGroup] {
        &self.groups
    }

    /// Threads in display order, across groups.
    pub fn entries(&self) -> impl Iterator<Item = &Thread> {
        self.groups.iter().flat_map(|g| g.threads.iter())
    }

    pub fn first(&self) -> Option<&Thread> {
        self.entries().next()
    }

    pub fn get(&self, id: ThreadId) -> Option<&Thread> {
        self.entries().find(|t| t.id == id)
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.threads.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn rows(&self, focused: ThreadId, highlighted: Option<ThreadId>) -> Vec<ThreadRow> {
        build_rows(&self.groups, focused, highlighted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn thread(id: u64, title: &str, age: Duration, now: DateTime<Utc>) -> Thread {
        Thread {
            id: ThreadId(id),
            title: title.to_string(),
            created_at: now - age,
            updated_at: None,
        }
    }

    #[test]
    fn only_non_empty_groups_in_bucket_order() {
        let now = Utc::now();
        let threads = vec![
            thread(5, "Resume Review", Duration::hours(2), now),
            thread(4, "Old chat", Duration::days(40), now),
            thread(3, "Fresh too", Duration::hours(5), now),
            thread(2, "Ancient", Duration::days(1000), now),
        ];
        let groups = group_threads(&threads, now);
        let buckets: Vec<_> = groups.iter().map(|g| g.bucket).collect();
        assert_eq!(
            buckets,
            vec![
                RecencyBucket::Today,
                RecencyBucket::PreviousYear,
                RecencyBucket::Older
            ]
        );
        let today: Vec<_> = groups[0].threads.iter().map(|t| t.id.0).collect();
        assert_eq!(today, vec![5, 3]);
    }

    #[test]
    fn rows_mark_focus_and_delete_affordance() {
        let now = Utc::now();
        let mut list = ThreadList::default();
        list.replace(
            &[
                thread(5, "Resume Review", Duration::hours(2), now),
                thread(4, "Interview prep", Duration::hours(30), now),
            ],
            now,
        );
        let rows = list.rows(ThreadId(5), Some(ThreadId(4)));
        assert_eq!(
            rows,
            vec![
                ThreadRow::Header("Today"),
                ThreadRow::Entry {
                    id: ThreadId(5),
                    title: "Resume Review".to_string(),
                    focused: true,
                    show_delete: false,
                },
                ThreadRow::Header("Yesterday"),
                ThreadRow::Entry {
                    id: ThreadId(4),
                    title: "Interview prep".to_string(),
                    focused: false,
                    show_delete: true,
                },
            ]
        );
        assert_eq!(list.len(), 2);
        assert_eq!(list.first().map(|t| t.id), Some(ThreadId(5)));
        assert!(list.contains(ThreadId(4)));
        assert!(!list.contains(ThreadId(9)));
    }

    #[test]
    fn empty_input_renders_nothing() {
        let list = ThreadList::default();
        assert!(list.is_empty());
        assert!(list.rows(ThreadId::NEW, None).is_empty());
    }
}
