//! Built-in checklist templates used when todo generation is unavailable.
//!
//! Exactly two templates exist: one for couples still choosing a date and one
//! for couples with a date, whose items carry deadlines counted back from the
//! wedding day.

use std::fmt;

use chrono::{DateTime, Duration, Months, Utc};

use super::{Priority, TodoItem, number_items};
use crate::date;

/// When an item is due relative to the wedding day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lead {
    MonthsBefore(u32),
    WeeksBefore(i64),
    DaysBefore(i64),
    WeeksAfter(i64),
}

impl Lead {
    fn deadline(self, wedding: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::MonthsBefore(m) => wedding.checked_sub_months(Months::new(m)),
            Self::WeeksBefore(w) => wedding.checked_sub_signed(Duration::weeks(w)),
            Self::DaysBefore(d) => wedding.checked_sub_signed(Duration::days(d)),
            Self::WeeksAfter(w) => wedding.checked_add_signed(Duration::weeks(w)),
        }
    }
}

/// One line of a template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateItem {
    pub title: &'static str,
    pub note: Option<&'static str>,
    pub category: &'static str,
    pub priority: Priority,
    pub lead: Option<Lead>,
}

const fn item(
    title: &'static str,
    category: &'static str,
    priority: Priority,
    lead: Option<Lead>,
) -> TemplateItem {
    TemplateItem {
        title,
        note: None,
        category,
        priority,
        lead,
    }
}

const fn noted(
    title: &'static str,
    note: &'static str,
    category: &'static str,
    priority: Priority,
    lead: Option<Lead>,
) -> TemplateItem {
    TemplateItem {
        title,
        note: Some(note),
        category,
        priority,
        lead,
    }
}

/// The two built-in checklists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoTemplate {
    DateUndecided,
    DateDecided,
}

impl TodoTemplate {
    /// Pick the template for a couple with or without a concrete date.
    pub fn select(has_date: bool) -> Self {
        if has_date {
            Self::DateDecided
        } else {
            Self::DateUndecided
        }
    }

    /// Name reported back to the caller as `templateUsed`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DateUndecided => "date_undecided",
            Self::DateDecided => "date_decided",
        }
    }

    pub fn items(&self) -> &'static [TemplateItem] {
        match self {
            Self::DateUndecided => DATE_UNDECIDED,
            Self::DateDecided => DATE_DECIDED,
        }
    }

    /// Instantiate the template as a numbered todo list.
    ///
    /// Deadlines are resolved against `wedding_date` when it parses; a
    /// deadline that would already be in the past is moved to today.
    pub fn instantiate(&self, wedding_date: Option<&str>, now: DateTime<Utc>) -> Vec<TodoItem> {
        let wedding = wedding_date.and_then(date::parse_calendar_date);
        let items = self
            .items()
            .iter()
            .map(|t| {
                let deadline = wedding
                    .zip(t.lead)
                    .and_then(|(w, lead)| lead.deadline(w))
                    .map(|d| d.max(now).format("%Y-%m-%d").to_string());
                TodoItem {
                    id: String::new(),
                    title: t.title.to_string(),
                    note: t.note.map(str::to_string),
                    category: t.category.to_string(),
                    deadline,
                    priority: t.priority,
                    completed: false,
                    created_at: now,
                    updated_at: now,
                }
            })
            .collect();
        number_items(items)
    }
}

impl fmt::Display for TodoTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

use Lead::{DaysBefore, MonthsBefore, WeeksAfter, WeeksBefore};
use Priority::{High, Low, Medium};

static DATE_UNDECIDED: &[TemplateItem] = &[
    noted(
        "Browse and favorite venues on the Vendors page",
        "Saving a few favorites helps narrow down dates that work for both of you.",
        "Venue",
        High,
        None,
    ),
    item("Set your overall wedding budget", "Budget", High, None),
    item("Draft a preliminary guest list", "Guests", High, None),
    item("Decide on your ideal wedding season", "Planning", High, None),
    item("Tour your top three venues", "Venue", High, None),
    item("Check venue availability for your preferred dates", "Venue", High, None),
    item("Choose a wedding date", "Planning", High, None),
    item("Talk through the style and vibe you want", "Planning", Medium, None),
    item("Start a shared inspiration board", "Planning", Low, None),
    item("Research photographers whose style you love", "Photography", Medium, None),
    item("Browse florists and save favorite arrangements", "Flowers", Low, None),
    item("Look into caterers that fit your budget", "Catering", Medium, None),
    item("Explore music options: band or DJ", "Music", Low, None),
    item("Decide on the size of your wedding party", "Guests", Medium, None),
    item("Start a wedding savings plan", "Budget", Medium, None),
    item("Consider hiring a wedding planner", "Planning", Low, None),
    item("Research wedding insurance options", "Budget", Low, None),
    item("Think about who could officiate", "Ceremony", Low, None),
    item("Set up a shared wedding email and calendar", "Planning", Low, None),
];

static DATE_DECIDED: &[TemplateItem] = &[
    // A year out
    item("Set your overall wedding budget", "Budget", High, Some(MonthsBefore(12))),
    item("Draft your guest list", "Guests", High, Some(MonthsBefore(12))),
    item("Book your ceremony and reception venue", "Venue", High, Some(MonthsBefore(12))),
    item("Hire a wedding planner or coordinator", "Planning", Medium, Some(MonthsBefore(12))),
    item("Choose your wedding party", "Guests", Medium, Some(MonthsBefore(11))),
    item("Book your photographer", "Photography", High, Some(MonthsBefore(11))),
    item("Book your videographer", "Photography", Medium, Some(MonthsBefore(10))),
    item("Book your caterer", "Catering", High, Some(MonthsBefore(10))),
    item("Book your band or DJ", "Music", High, Some(MonthsBefore(10))),
    item("Book your officiant", "Ceremony", High, Some(MonthsBefore(10))),
    // Nine to six months
    item("Create a wedding website", "Planning", Medium, Some(MonthsBefore(9))),
    item("Purchase wedding insurance", "Budget", Low, Some(MonthsBefore(9))),
    item("Shop for wedding attire", "Attire", High, Some(MonthsBefore(9))),
    noted(
        "Send save-the-dates",
        "Give destination guests extra notice.",
        "Guests",
        High,
        Some(MonthsBefore(8)),
    ),
    item("Book your florist", "Flowers", High, Some(MonthsBefore(8))),
    item("Reserve hotel room blocks for guests", "Guests", Medium, Some(MonthsBefore(8))),
    item("Register for gifts", "Planning", Medium, Some(MonthsBefore(7))),
    item("Choose wedding party attire", "Attire", Medium, Some(MonthsBefore(7))),
    item("Book hair and makeup artists", "Attire", Medium, Some(MonthsBefore(6))),
    item("Plan the honeymoon", "Honeymoon", Medium, Some(MonthsBefore(6))),
    item("Order the wedding cake", "Catering", Medium, Some(MonthsBefore(6))),
    // Five to three months
    item("Book guest and wedding party transportation", "Logistics", Medium, Some(MonthsBefore(5))),
    item("Book the rehearsal dinner venue", "Planning", Medium, Some(MonthsBefore(5))),
    item("Arrange rentals: tables, chairs, linens", "Logistics", Low, Some(MonthsBefore(5))),
    item("Order wedding invitations", "Guests", High, Some(MonthsBefore(5))),
    item("Schedule your first attire fitting", "Attire", Medium, Some(MonthsBefore(4))),
    item("Buy wedding rings", "Attire", High, Some(MonthsBefore(4))),
    item("Plan the ceremony with your officiant", "Ceremony", Medium, Some(MonthsBefore(4))),
    item("Schedule a menu tasting", "Catering", Medium, Some(MonthsBefore(4))),
    item("Choose ceremony readings and music", "Ceremony", Medium, Some(MonthsBefore(3))),
    item("Finalize the reception menu", "Catering", High, Some(MonthsBefore(3))),
    item("Order favors and welcome bags", "Planning", Low, Some(MonthsBefore(3))),
    item("Check passports and travel documents", "Honeymoon", Low, Some(MonthsBefore(3))),
    item("Schedule a hair and makeup trial", "Attire", Medium, Some(MonthsBefore(3))),
    // Two months to one month
    noted(
        "Mail invitations",
        "Set the RSVP deadline about four weeks before the wedding.",
        "Guests",
        High,
        Some(MonthsBefore(2)),
    ),
    item("Write your vows", "Ceremony", Medium, Some(MonthsBefore(2))),
    item("Draft the day-of timeline", "Planning", High, Some(MonthsBefore(2))),
    item("Purchase wedding party gifts", "Planning", Low, Some(MonthsBefore(2))),
    item("Confirm the playlist and do-not-play list", "Music", Medium, Some(MonthsBefore(2))),
    noted(
        "Obtain your marriage license",
        "Check how long the license is valid in your county.",
        "Legal",
        High,
        Some(MonthsBefore(1)),
    ),
    item("Follow up with guests who have not RSVPed", "Guests", High, Some(MonthsBefore(1))),
    item("Create the seating chart", "Guests", High, Some(MonthsBefore(1))),
    item("Final attire fitting", "Attire", High, Some(MonthsBefore(1))),
    item("Confirm details with every vendor", "Vendors", High, Some(MonthsBefore(1))),
    item("Break in your wedding shoes", "Attire", Low, Some(MonthsBefore(1))),
    // Final weeks
    item("Give the final headcount to your caterer", "Catering", High, Some(WeeksBefore(3))),
    item("Finalize the shot list with your photographer", "Photography", Medium, Some(WeeksBefore(3))),
    item("Print programs, menus, and place cards", "Planning", Medium, Some(WeeksBefore(3))),
    item("Prepare final vendor payments and tips", "Budget", High, Some(WeeksBefore(2))),
    item("Confirm the transportation schedule", "Logistics", Medium, Some(WeeksBefore(2))),
    item("Pack for the honeymoon", "Honeymoon", Medium, Some(WeeksBefore(1))),
    item("Hand off day-of tasks to the wedding party", "Planning", Medium, Some(WeeksBefore(1))),
    item("Attend the rehearsal and rehearsal dinner", "Ceremony", High, Some(DaysBefore(1))),
    item("Drop off decor and personal items at the venue", "Logistics", Medium, Some(DaysBefore(1))),
    // After the wedding
    item("Send thank-you notes", "Guests", Medium, Some(WeeksAfter(4))),
    item("Return rentals and preserve your attire", "Logistics", Low, Some(WeeksAfter(2))),
];
