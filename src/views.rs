//! HTML Views
//!
//! Server-rendered pages for the bucket list and the object listing.
//! Every bucket name and key placed in a link goes through
//! [`encode_segment`], every value placed in markup through [`escape`].

use crate::storage::{BucketSummary, ObjectSummary};

/// Percent-encode a bucket name or key for use as one path segment.
///
/// Reserved characters, `/` included, are encoded so keys like
/// `a/b?c.txt` survive the round trip through the router.
pub fn encode_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Escape text for HTML element content and attribute values
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

const STYLE: &str = "body{font-family:sans-serif;margin:2em;}\
table{border-collapse:collapse;margin:1em 0;}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left;}\
.notice{background:#fff3cd;border:1px solid #e0c36b;padding:6px 10px;margin:4px 0;}\
form.inline{display:inline;}";

fn page(title: &str, notices: &[String], body: &str) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\">\n");
    html.push_str(&format!("  <title>{}</title>\n", escape(title)));
    html.push_str(&format!("  <style>{}</style>\n", STYLE));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape(title)));

    for notice in notices {
        html.push_str(&format!("<div class=\"notice\">{}</div>\n", escape(notice)));
    }

    html.push_str(body);
    html.push_str("</body>\n</html>\n");
    html
}

/// Bucket list with the create-bucket form
pub fn home(buckets: &[BucketSummary], notices: &[String]) -> String {
    let mut body = String::new();

    body.push_str("<form method=\"post\" action=\"/create_bucket\">\n");
    body.push_str("  <input type=\"text\" name=\"bucket_name\" placeholder=\"New bucket name\" required>\n");
    body.push_str("  <button type=\"submit\">Create bucket</button>\n");
    body.push_str("</form>\n");

    if buckets.is_empty() {
        body.push_str("<p>No buckets found.</p>\n");
        return page("Buckets", notices, &body);
    }

    body.push_str("<table>\n  <tr><th>Name</th><th>Created</th><th></th></tr>\n");
    for bucket in buckets {
        let link = encode_segment(&bucket.name);
        body.push_str(&format!(
            "  <tr><td><a href=\"/bucket/{link}\">{name}</a></td><td>{created}</td>\
             <td><a href=\"/delete_bucket/{link}\">Delete</a></td></tr>\n",
            link = link,
            name = escape(&bucket.name),
            created = escape(&bucket.creation_date),
        ));
    }
    body.push_str("</table>\n");

    page("Buckets", notices, &body)
}

fn destination_form(action: &str, label: &str, key: &str, buckets: &[BucketSummary]) -> String {
    let mut form = format!("<form class=\"inline\" method=\"post\" action=\"{}\">", action);
    form.push_str("<select name=\"dest_bucket\">");
    for bucket in buckets {
        let name = escape(&bucket.name);
        form.push_str(&format!("<option value=\"{0}\">{0}</option>", name));
    }
    form.push_str("</select>");
    form.push_str(&format!(
        "<input type=\"text\" name=\"dest_key\" placeholder=\"{}\">",
        escape(key)
    ));
    form.push_str(&format!("<button type=\"submit\">{}</button></form>", label));
    form
}

/// Object listing with upload, folder, copy and move forms
pub fn objects(
    bucket: &str,
    objects: &[ObjectSummary],
    buckets: &[BucketSummary],
    notices: &[String],
) -> String {
    let bucket_link = encode_segment(bucket);
    let mut body = String::new();

    body.push_str("<p><a href=\"/\">&larr; All buckets</a></p>\n");

    body.push_str(&format!(
        "<form method=\"post\" action=\"/upload/{}\" enctype=\"multipart/form-data\">\n",
        bucket_link
    ));
    body.push_str("  <input type=\"file\" name=\"file\">\n");
    body.push_str("  <button type=\"submit\">Upload</button>\n");
    body.push_str("</form>\n");

    body.push_str(&format!(
        "<form method=\"post\" action=\"/create_folder/{}\">\n",
        bucket_link
    ));
    body.push_str("  <input type=\"text\" name=\"folder_name\" placeholder=\"New folder\" required>\n");
    body.push_str("  <button type=\"submit\">Create folder</button>\n");
    body.push_str("</form>\n");

    if objects.is_empty() {
        body.push_str("<p>This bucket is empty.</p>\n");
        return page(&format!("Bucket: {}", bucket), notices, &body);
    }

    body.push_str("<table>\n  <tr><th>Key</th><th>Size</th><th>Last modified</th><th>Actions</th></tr>\n");
    for object in objects {
        let target = format!("{}/{}", bucket_link, encode_segment(&object.key));
        body.push_str(&format!(
            "  <tr><td>{key}</td><td>{size}</td><td>{modified}</td><td>\
             <a href=\"/download_file/{target}\">Download</a> \
             <a href=\"/delete_file/{target}\">Delete</a> {copy} {mv}</td></tr>\n",
            key = escape(&object.key),
            size = format_size(object.size),
            modified = escape(&object.last_modified),
            target = target,
            copy = destination_form(&format!("/copy_file/{}", target), "Copy", &object.key, buckets),
            mv = destination_form(&format!("/move_file/{}", target), "Move", &object.key, buckets),
        ));
    }
    body.push_str("</table>\n");

    page(&format!("Bucket: {}", bucket), notices, &body)
}
