//! Message templates sent to members after a refund decision.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
}

pub fn approved_template() -> EmailTemplate {
    EmailTemplate {
        subject: "Refund processed - you are all set!".to_string(),
        body: "Hey there!\n\n\
               We just processed your refund per our policy. The funds will hit \
               your account within 3-5 business days. Access to the product has \
               been turned off, so feel free to rejoin whenever you are ready.\n\n\
               Need anything else? Just hit reply and we will help.\n\n\
               - RefundGuard Bot"
            .to_string(),
    }
}

/// Denial message rendered from the creator's policy. The window label and
/// any custom condition text are interpolated verbatim.
pub fn denial_template(
    window_label: &str,
    custom_condition: Option<&str>,
    support_email: Option<&str>,
) -> EmailTemplate {
    let condition_line = match custom_condition {
        Some(condition) if !condition.trim().is_empty() => {
            format!("\n\nOur policy also asks that: {}", condition.trim())
        }
        _ => String::new(),
    };
    let support_line = match support_email {
        Some(email) if !email.is_empty() => format!(" at {}", email),
        _ => String::new(),
    };

    EmailTemplate {
        subject: "Refund request update".to_string(),
        body: format!(
            "Hi creator friend,\n\n\
             Thanks for reaching out. Per our refund policy, requests after \
             {window_label} are not eligible because access is delivered \
             instantly.{condition_line}\n\n\
             To get the most from what you already unlocked:\n\
             - Start with the onboarding module to implement the checklist fast.\n\
             - Join the weekly office hours to get live support.\n\
             - DM us inside the community with your current blocker.\n\n\
             If you still feel stuck, reply to this email and our team will \
             personally take care of you{support_line}.\n\n\
             Appreciate you,\n\
             - RefundGuard Bot"
        ),
    }
}
