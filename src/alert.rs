//! Alert messages for reporting the outcome of form submissions.
//!
//! Alerts are rendered into the `#alert-container` element of the base page
//! by forms that set `hx-target-error="#alert-container"`.

use maud::{Markup, html};

/// Alert message types for styling
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertType {
    Success,
    Error,
}

/// A message with optional details.
#[derive(Debug)]
pub struct Alert<'a> {
    pub alert_type: AlertType,
    pub message: &'a str,
    pub details: &'a str,
}

impl<'a> Alert<'a> {
    /// Create a new success alert
    #[allow(dead_code)]
    pub fn success(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Success,
            message,
            details,
        }
    }

    /// Create a new error alert
    pub fn error(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Error,
            message,
            details,
        }
    }

    pub fn into_html(self) -> Markup {
        let style = match self.alert_type {
            AlertType::Success => {
                "p-4 mb-4 text-sm rounded-lg border text-green-800 border-green-300 \
                bg-green-50 dark:bg-gray-800 dark:text-green-400 dark:border-green-800"
            }
            AlertType::Error => {
                "p-4 mb-4 text-sm rounded-lg border text-red-800 border-red-300 \
                bg-red-50 dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
            }
        };
        let role = match self.alert_type {
            AlertType::Success => "status",
            AlertType::Error => "alert",
        };

        html! {
            div class=(style) role=(role)
            {
                div class="flex items-start justify-between gap-4"
                {
                    div
                    {
                        span class="font-semibold" { (self.message) }

                        @if !self.details.is_empty()
                        {
                            p class="mt-1" { (self.details) }
                        }
                    }

                    button
                        type="button"
                        aria-label="Dismiss"
                        onclick="this.closest('[role]').remove()"
                        class="bg-transparent border-none cursor-pointer"
                    {
                        "×"
                    }
                }
            }
        }
    }
}
