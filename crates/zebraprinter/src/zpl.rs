//! ZPL badge label encoder.
//!
//! Pure translation of user display fields plus a barcode payload into a
//! fixed-geometry 4x3 cm label. No I/O and no owned state; the only
//! environmental input is the clock, which is injectable for determinism.
//!
//! The field bounds and label dimensions here are coupled to the physical
//! label stock the session configures on the device.

use chrono::{DateTime, Local};

use crate::{LABEL_HEIGHT_DOTS, LABEL_WIDTH_DOTS};

/// Character bounds per text field. Longer values are cut to `bound - 3`
/// with a `...` suffix, so a bounded field never exceeds its bound.
const MAX_NAME_CHARS: usize = 20;
const MAX_EMAIL_CHARS: usize = 25;
const MAX_ROLE_CHARS: usize = 15;
const MAX_USERNAME_CHARS: usize = 20;

/// Display fields printed on a badge label.
#[derive(Debug, Clone)]
pub struct LabelUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl LabelUser {
    /// Full display name, "first last".
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Encode a badge label, stamping it with the current local time.
pub fn user_label(user: &LabelUser, barcode: &str) -> String {
    user_label_at(user, barcode, Local::now())
}

/// Encode a badge label with an explicit clock reading.
///
/// Byte-identical output for identical inputs and timestamp.
pub fn user_label_at(user: &LabelUser, barcode: &str, printed_at: DateTime<Local>) -> String {
    let clean_barcode: String = barcode
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    let display_name = truncate_text(&user.name(), MAX_NAME_CHARS);
    let display_email = truncate_text(&user.email, MAX_EMAIL_CHARS);
    let display_role = truncate_text(&user.role, MAX_ROLE_CHARS);
    let display_username = truncate_text(&user.username, MAX_USERNAME_CHARS);
    let printed = printed_at.format("%d/%m %H:%M");

    format!(
        "^XA\n\
         ^CI28\n\
         ^PW{width}\n\
         ^LL{height}\n\
         ^LH0,0\n\
         ^LS0\n\
         \n\
         ^CF0,18\n\
         ^FO10,10^FDUser: {username}^FS\n\
         \n\
         ^CF0,16\n\
         ^FO10,35^FDName: {name}^FS\n\
         ^FO10,55^FDEmail: {email}^FS\n\
         ^FO10,75^FDRole: {role}^FS\n\
         \n\
         ^BY2,2,50\n\
         ^FO30,110^BCN,50,Y,N,N\n\
         ^FD{barcode}^FS\n\
         \n\
         ^CF0,12\n\
         ^FO10,180^FDPrinted: {printed}^FS\n\
         \n\
         ^PQ1,0,1,Y\n\
         ^XZ",
        width = LABEL_WIDTH_DOTS,
        height = LABEL_HEIGHT_DOTS,
        username = display_username,
        name = display_name,
        email = display_email,
        role = display_role,
        barcode = clean_barcode,
        printed = printed,
    )
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars - 3).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample_user() -> LabelUser {
        LabelUser {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            username: "jdoe".into(),
            email: "jane.doe@example.com".into(),
            role: "Operator".into(),
        }
    }

    fn frozen_clock() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 7, 14, 30, 0).unwrap()
    }

    #[test]
    fn truncate_keeps_short_text_unchanged() {
        assert_eq!(truncate_text("short", 20), "short");
        assert_eq!(truncate_text("exactly-ten", 11), "exactly-ten");
    }

    #[test]
    fn truncate_cuts_to_bound_with_ellipsis() {
        let long = "a".repeat(30);
        let out = truncate_text(&long, 20);
        assert_eq!(out.chars().count(), 20);
        assert!(out.ends_with("..."));
        assert_eq!(out, format!("{}...", "a".repeat(17)));
    }

    #[test]
    fn long_fields_are_bounded_in_output() {
        let user = LabelUser {
            first_name: "Maximiliana".into(),
            last_name: "Wolfeschlegelstein".into(),
            username: "jdoe".into(),
            email: "a.very.long.address@example-corporation.com".into(),
            role: "Operator".into(),
        };
        let out = user_label_at(&user, "B123", frozen_clock());

        let name_line = out
            .lines()
            .find(|l| l.contains("^FDName:"))
            .expect("name line");
        let name = name_line
            .trim_start_matches("^FO10,35^FDName: ")
            .trim_end_matches("^FS");
        assert_eq!(name.chars().count(), MAX_NAME_CHARS);
        assert!(name.ends_with("..."));

        let email_line = out
            .lines()
            .find(|l| l.contains("^FDEmail:"))
            .expect("email line");
        let email = email_line
            .trim_start_matches("^FO10,55^FDEmail: ")
            .trim_end_matches("^FS");
        assert_eq!(email.chars().count(), MAX_EMAIL_CHARS);
        assert!(email.ends_with("..."));
    }

    #[test]
    fn barcode_is_trimmed_squeezed_and_uppercased() {
        let out = user_label_at(&sample_user(), "  ab 12 cd  ", frozen_clock());
        assert!(out.contains("^FDAB12CD^FS"));
    }

    #[test]
    fn geometry_is_fixed_regardless_of_content() {
        let short = user_label_at(&sample_user(), "X", frozen_clock());
        let user = LabelUser {
            first_name: "A".repeat(40),
            last_name: "B".repeat(40),
            username: "C".repeat(40),
            email: "D".repeat(40),
            role: "E".repeat(40),
        };
        let long = user_label_at(&user, &"F".repeat(40), frozen_clock());

        for label in [&short, &long] {
            assert!(label.starts_with("^XA"));
            assert!(label.ends_with("^XZ"));
            assert!(label.contains("^PW320"));
            assert!(label.contains("^LL240"));
            assert!(label.contains("^BCN,50,Y,N,N"));
        }
    }

    #[test]
    fn output_is_deterministic_for_frozen_clock() {
        let a = user_label_at(&sample_user(), "B123", frozen_clock());
        let b = user_label_at(&sample_user(), "B123", frozen_clock());
        assert_eq!(a, b);
        assert!(a.contains("Printed: 07/03 14:30"));
    }
}
