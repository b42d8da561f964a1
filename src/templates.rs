//! HTML pages for the login, registration and landing routes.

use crate::db::UserRecord;

pub fn login_page(error: Option<&str>, username: &str) -> String {
    layout(
        "Log in",
        &format!(
            r#"<h1>Log in</h1>
{error}<form method="post" action="/login">
  <label>Username <input type="text" name="username" value="{username}" required></label>
  <label>Password <input type="password" name="password" required></label>
  <button type="submit">Log in</button>
</form>
<p>No account yet? <a href="/register">Register</a></p>"#,
            error = error_block(error),
            username = escape(username),
        ),
    )
}

pub fn register_page(error: Option<&str>, username: &str, email: &str) -> String {
    layout(
        "Register",
        &format!(
            r#"<h1>Register</h1>
{error}<form method="post" action="/register">
  <label>Username <input type="text" name="username" value="{username}" required></label>
  <label>Email <input type="email" name="email" value="{email}" required></label>
  <label>Password <input type="password" name="password" required></label>
  <button type="submit">Create account</button>
</form>
<p>Already registered? <a href="/login">Log in</a></p>"#,
            error = error_block(error),
            username = escape(username),
            email = escape(email),
        ),
    )
}

pub fn home_page(user: &UserRecord) -> String {
    layout(
        "Home",
        &format!(
            r#"<h1>Welcome, {username}</h1>
<p>Signed in as {email}.</p>
<form method="post" action="/logout"><button type="submit">Log out</button></form>"#,
            username = escape(&user.username),
            email = escape(&user.email),
        ),
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

fn error_block(error: Option<&str>) -> String {
    error
        .map(|msg| format!("<p class=\"error\" role=\"alert\">{}</p>\n", escape(msg)))
        .unwrap_or_default()
}

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(
            escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_login_page_echoes_username_escaped() {
        let page = login_page(Some("Invalid username or password"), "<b>bob</b>");
        assert!(page.contains("Invalid username or password"));
        assert!(page.contains("&lt;b&gt;bob&lt;/b&gt;"));
        assert!(!page.contains("<b>bob</b>"));
    }

    #[test]
    fn test_pages_without_error_have_no_alert() {
        assert!(!login_page(None, "").contains("role=\"alert\""));
        assert!(!register_page(None, "", "").contains("role=\"alert\""));
    }

    #[test]
    fn test_home_page_greets_user() {
        let user = UserRecord::new("testuser", "test@example.com", "$argon2id$fake");
        let page = home_page(&user);
        assert!(page.contains("Welcome, testuser"));
        assert!(page.contains("test@example.com"));
        assert!(!page.contains("argon2id"));
    }
}
