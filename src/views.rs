//! HTML pages.
//!
//! Pages are plain: a shared layout, a navigation bar that
//! depends on the principal's role, pending flash messages, and a body.

use axum::response::Html;
use std::fmt::Write;

use crate::{
    auth::{Flash, FlashKind},
    models::{Account, Course, Role},
};

/// Escapes text for inclusion in HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn nav(principal: Option<&Account>) -> String {
    match principal {
        None => r#"<a href="/">Home</a> <a href="/login">Log in</a> <a href="/register">Register</a>"#
            .to_string(),
        Some(account) => {
            let links = match account.role {
                Role::Learner => {
                    r#"<a href="/student/index">My courses</a> <a href="/student/find">Find courses</a>"#
                }
                Role::Instructor => {
                    r#"<a href="/teacher/index">My courses</a> <a href="/teacher/create">New course</a>"#
                }
            };
            format!(
                r#"{links} <span class="user">{}</span> <a href="/logout">Log out</a>"#,
                escape(&account.fullname)
            )
        }
    }
}

fn flashes(flashes: &[Flash]) -> String {
    flashes.iter().fold(String::new(), |mut out, flash| {
        let class = match flash.kind {
            FlashKind::Success => "flash success",
            FlashKind::Error => "flash error",
        };
        let _ = write!(out, r#"<p class="{class}">{}</p>"#, escape(&flash.message));
        out
    })
}

fn layout(title: &str, principal: Option<&Account>, pending: &[Flash], body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title} | Course Portal</title></head>\
         <body><nav>{}</nav><main>{}<h1>{title}</h1>{body}</main></body></html>",
        nav(principal),
        flashes(pending),
        title = escape(title),
    ))
}

fn course_rows(courses: &[Course], enroll_links: bool) -> String {
    if courses.is_empty() {
        return "<p>No courses.</p>".to_string();
    }
    let mut out = String::from("<ul class=\"courses\">");
    for course in courses {
        let _ = write!(
            out,
            "<li><strong>{}</strong> by {} ({:.2}) <span>{}</span> <small>{} enrolled</small>",
            escape(&course.name),
            escape(&course.author),
            course.price,
            escape(&course.description),
            course.students.len(),
        );
        if enroll_links {
            let _ = write!(out, r#" <a href="/courses/{}">Enroll</a>"#, course.id);
        }
        out.push_str("</li>");
    }
    out.push_str("</ul>");
    out
}

pub fn landing(pending: &[Flash]) -> Html<String> {
    layout(
        "Welcome",
        None,
        pending,
        r#"<p>Learners join courses, instructors publish them.</p><p><a href="/register">Create an account</a> or <a href="/login">log in</a>.</p>"#,
    )
}

pub fn login(pending: &[Flash]) -> Html<String> {
    layout(
        "Log in",
        None,
        pending,
        r#"<form method="post" action="/login">
<label>Email <input type="text" name="username" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Log in</button>
</form>"#,
    )
}

pub fn register(pending: &[Flash]) -> Html<String> {
    layout(
        "Register",
        None,
        pending,
        r#"<form method="post" action="/register">
<label>Full name <input type="text" name="fullname"></label>
<label>I am a <select name="usertype"><option value="learner">Learner</option><option value="instructor">Instructor</option></select></label>
<label>Email <input type="text" name="username" required></label>
<label>Password <input type="password" name="password" required></label>
<label>Confirm password <input type="password" name="password2" required></label>
<button type="submit">Register</button>
</form>"#,
    )
}

pub fn student_index(account: &Account, courses: &[Course], pending: &[Flash]) -> Html<String> {
    layout("My courses", Some(account), pending, &course_rows(courses, false))
}

/// Search page. `results` is `None` before a search has been made.
pub fn student_find(
    account: &Account,
    key: &str,
    results: Option<&[Course]>,
    pending: &[Flash],
) -> Html<String> {
    let mut body = format!(
        r#"<form method="get" action="/courses/find"><input type="text" name="key" value="{}"><button type="submit">Search</button></form>"#,
        escape(key)
    );
    if let Some(courses) = results {
        body.push_str(&course_rows(courses, true));
    }
    layout("Find courses", Some(account), pending, &body)
}

pub fn teacher_index(account: &Account, courses: &[Course], pending: &[Flash]) -> Html<String> {
    layout("My courses", Some(account), pending, &course_rows(courses, false))
}

pub fn teacher_create(account: &Account, pending: &[Flash]) -> Html<String> {
    layout(
        "New course",
        Some(account),
        pending,
        r#"<form method="post" action="/teacher/create">
<label>Name <input type="text" name="courseName" required></label>
<label>Description <textarea name="description"></textarea></label>
<label>Price <input type="number" name="price" min="0" step="0.01" required></label>
<button type="submit">Create</button>
</form>"#,
    )
}

pub fn forbidden() -> Html<String> {
    layout("403 Forbidden", None, &[], "<p>You are not allowed to view this page.</p>")
}

pub fn not_found() -> Html<String> {
    layout("404 Not Found", None, &[], "<p>There is nothing here.</p>")
}

pub fn server_error() -> Html<String> {
    layout(
        "500 Internal Server Error",
        None,
        &[],
        "<p>Something went wrong. Please try again later.</p>",
    )
}
