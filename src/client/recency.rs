use chrono::{DateTime, Duration, Utc};

/// Recency groups for the thread list, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecencyBucket {
    Today,
    Yesterday,
    PreviousWeek,
    PreviousMonth,
    PreviousYear,
    PreviousTwoYears,
    Older,
}

/// Upper bounds in days; a thread belongs to the first bucket whose bound its age is below.
const BOUNDS: [(RecencyBucket, i64); 6] = [
    (RecencyBucket::Today, 1),
    (RecencyBucket::Yesterday, 2),
    (RecencyBucket::PreviousWeek, 7),
    (RecencyBucket::PreviousMonth, 30),
    (RecencyBucket::PreviousYear, 365),
    (RecencyBucket::PreviousTwoYears, 730),
];

impl RecencyBucket {
    pub const ALL: [RecencyBucket; 7] = [
        RecencyBucket::Today,
        RecencyBucket::Yesterday,
        RecencyBucket::PreviousWeek,
        RecencyBucket::PreviousMonth,
        RecencyBucket::PreviousYear,
        RecencyBucket::PreviousTwoYears,
        RecencyBucket::Older,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RecencyBucket::Today => "Today",
            RecencyBucket::Yesterday => "Yesterday",
            RecencyBucket::PreviousWeek => "Previous 7 Days",
            RecencyBucket::PreviousMonth => "Previous 30 Days",
            RecencyBucket::PreviousYear => "Previous Year",
            RecencyBucket::PreviousTwoYears => "Previous 2 Years",
            RecencyBucket::Older => "Older",
        }
    }

    /// Negative ages (clock skew) count as zero.
    pub fn for_age(age: Duration) -> Self {
        let age = age.max(Duration::zero());
        BOUNDS
            .iter()
            .find(|(_, days)| age < Duration::days(*days))
            .map(|(bucket, _)| *bucket)
            .unwrap_or(RecencyBucket::Older)
    }

    pub fn classify(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::for_age(now - created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_exclusive_upper_bounds() {
        let cases = [
            (Duration::zero(), RecencyBucket::Today),
            (Duration::hours(2), RecencyBucket::Today),
            (Duration::days(1) - Duration::seconds(1), RecencyBucket::Today),
            (Duration::days(1), RecencyBucket::Yesterday),
            (Duration::days(2), RecencyBucket::PreviousWeek),
            (Duration::days(6), RecencyBucket::PreviousWeek),
            (Duration::days(7), RecencyBucket::PreviousMonth),
            (Duration::days(29), RecencyBucket::PreviousMonth),
            (Duration::days(30), RecencyBucket::PreviousYear),
            (Duration::days(364), RecencyBucket::PreviousYear),
            (Duration::days(365), RecencyBucket::PreviousTwoYears),
            (Duration::days(729), RecencyBucket::PreviousTwoYears),
            (Duration::days(730), RecencyBucket::Older),
            (Duration::days(5000), RecencyBucket::Older),
        ];
        for (age, expected) in cases {
            assert_eq!(RecencyBucket::for_age(age), expected, "age {age}");
        }
    }

    #[test]
    fn every_age_lands_in_exactly_one_bucket() {
        for hours in (0..800 * 24).step_by(7) {
            let age = Duration::hours(hours);
            let bucket = RecencyBucket::for_age(age);
            let matching = BOUNDS
                .iter()
                .filter(|(b, _)| *b == bucket)
                .count()
                + usize::from(bucket == RecencyBucket::Older);
            assert_eq!(matching, 1);
            let days = age.num_days();
            let lower = RecencyBucket::ALL
                .iter()
                .position(|b| *b == bucket)
                .map(|i| if i == 0 { 0 } else { BOUNDS[i - 1].1 })
                .unwrap();
            assert!(days >= lower, "age {days}d below lower bound {lower} of {bucket:?}");
        }
    }

    #[test]
    fn future_timestamps_count_as_today() {
        let now = Utc::now();
        let future = now + Duration::hours(3);
        assert_eq!(RecencyBucket::classify(future, now), RecencyBucket::Today);
    }

    #[test]
    fn labels_follow_display_order() {
        let labels: Vec<_> = RecencyBucket::ALL.iter().map(|b| b.label()).collect();
        assert_eq!(labels.first(), Some(&"Today"));
        assert_eq!(labels.last(), Some(&"Older"));
        assert!(RecencyBucket::Today < RecencyBucket::Older);
    }
}
