//! HTML pages and fragments.
//!
//! Everything user- or model-supplied goes through `escape_html` before it
//! lands in markup.

use vibegate_common::constants::paths;

use crate::html::escape_html;

/// Element id of the landing page's sign-in button
pub const AUTH_BUTTON_ID: &str = "auth-button";

/// Retry form shown under a denial while attempts remain
pub struct RetryForm<'a> {
    pub session_id: &'a str,
    pub challenge: &'a str,
    pub attempts_remaining: u32,
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #1a1a2e; color: #eee; display: flex; justify-content: center; padding: 4rem 1rem; }}
main {{ max-width: 40rem; width: 100%; text-align: center; }}
button, a.button {{ background: #e94560; color: #fff; border: 0; border-radius: .5rem; padding: .75rem 1.5rem; font-size: 1rem; cursor: pointer; text-decoration: none; }}
textarea {{ width: 100%; min-height: 6rem; margin: 1rem 0; }}
.granted {{ color: #4ecca3; }}
.denied {{ color: #e94560; }}
</style>
</head>
<body>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape_html(title),
        body = body,
    )
}

/// Landing page with the sign-in button that fetches the challenge modal
pub fn landing_page() -> String {
    let body = format!(
        r#"<h1>Members only</h1>
<p>Access is granted by vibe alone. Are you worthy?</p>
<button id="{button}" type="button">Sign in</button>
<div id="modal"></div>
<script>
document.getElementById("{button}").addEventListener("click", async () => {{
  const modal = document.getElementById("modal");
  modal.textContent = "Consulting the oracle...";
  const resp = await fetch("{endpoint}", {{ method: "POST" }});
  modal.innerHTML = await resp.text();
  for (const old of modal.querySelectorAll("script")) {{
    const fresh = document.createElement("script");
    fresh.textContent = old.textContent;
    old.replaceWith(fresh);
  }}
}});
</script>"#,
        button = AUTH_BUTTON_ID,
        endpoint = paths::SIGNIN_MODAL,
    );
    page("Vibe Check", &body)
}

/// Appended to the challenge modal so the sign-in button goes away
pub fn hide_auth_button_script() -> String {
    format!(
        r#"
<script>
(function () {{
  var button = document.getElementById("{}");
  if (button) {{ button.style.display = "none"; }}
}})();
</script>"#,
        AUTH_BUTTON_ID
    )
}

pub fn access_granted_page(message: &str) -> String {
    let body = format!(
        r#"<h1 class="granted">ACCESS GRANTED</h1>
<p>{}</p>"#,
        escape_html(message)
    );
    page("Access Granted", &body)
}

pub fn access_denied_page(message: &str, retry: Option<RetryForm<'_>>) -> String {
    let mut body = format!(
        r#"<h1 class="denied">ACCESS DENIED</h1>
<p>{}</p>"#,
        escape_html(message)
    );

    match retry {
        Some(form) => body.push_str(&format!(
            r#"
<form method="post" action="{action}">
<input type="hidden" name="session_id" value="{session_id}">
<input type="hidden" name="challenge" value="{challenge_attr}">
<p>{challenge}</p>
<textarea name="user_input" maxlength="2000" required></textarea>
<p>{remaining} attempt{plural} left.</p>
<button type="submit">Try again</button>
</form>"#,
            action = paths::CHECK_VIBE,
            session_id = escape_html(form.session_id),
            challenge_attr = escape_html(form.challenge),
            challenge = escape_html(form.challenge),
            remaining = form.attempts_remaining,
            plural = if form.attempts_remaining == 1 { "" } else { "s" },
        )),
        None => body.push_str(&format!(
            r#"
<p><a class="button" href="{}">Start over</a></p>"#,
            paths::LANDING
        )),
    }

    page("Access Denied", &body)
}

/// Bare error fragment, returned with a non-2xx status
pub fn error_fragment(message: &str) -> String {
    format!("<p>{}</p>", escape_html(message))
}
