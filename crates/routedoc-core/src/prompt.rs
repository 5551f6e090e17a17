//! Prompt composition for a single route unit.
//!
//! The prompt asks the model for one JSON object describing the route and
//! spells out how bracketed dynamic segments map to `{param}` templates.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::RouteUnit;

/// Matches `[[...slug]]`, `[...slug]` and `[id]` segments, in that priority.
static DYNAMIC_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[\.\.\.([^\[\]/\\]+)\]\]|\[\.\.\.([^\[\]/\\]+)\]|\[([^\[\]/\\]+)\]")
        .expect("dynamic segment pattern is valid")
});

/// The reply shape requested from the model.
const TARGET_SCHEMA: &str = r#"{
  "path": "/api/path/here",
  "description": "Brief description of what this API endpoint does",
  "methods": {
    "GET": {
      "summary": "Brief summary",
      "description": "Detailed description",
      "parameters": [
        {
          "name": "paramName",
          "type": "string",
          "in": "path",
          "required": true
        }
      ]
    }
  }
}"#;

const RULES: &str = "Rules:
1. Convert [id] to {id} in the path
2. Convert [...slug] to {slug} in the path
3. Only include methods that actually exist in the code
4. Return ONLY the JSON, no markdown, no explanations, no code blocks";

/// A bracketed segment found in a route file's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicSegment {
    /// The segment as written on disk, e.g. `[...slug]`.
    pub raw: String,
    /// Parameter name, e.g. `slug`.
    pub name: String,
    /// Whether the segment captures several path components.
    pub catch_all: bool,
}

impl DynamicSegment {
    /// The template form the model should emit, e.g. `{slug}`.
    #[must_use]
    pub fn template(&self) -> String {
        format!("{{{}}}", self.name)
    }
}

/// Extract the dynamic segments from a route file path, in path order.
#[must_use]
pub fn dynamic_segments(path: &str) -> Vec<DynamicSegment> {
    DYNAMIC_SEGMENT
        .captures_iter(path)
        .filter_map(|caps| {
            let raw = caps.get(0)?.as_str().to_string();
            let (name, catch_all) = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(name), _, _) | (_, Some(name), _) => (name.as_str(), true),
                (_, _, Some(name)) => (name.as_str(), false),
                _ => return None,
            };
            Some(DynamicSegment {
                raw,
                name: name.to_string(),
                catch_all,
            })
        })
        .collect()
}

/// Build the generation prompt for one route unit.
///
/// Pure function of the unit: same unit, same prompt.
#[must_use]
pub fn compose_prompt(unit: &RouteUnit) -> String {
    let path = unit.file_path.to_string_lossy();

    let mut prompt = String::with_capacity(unit.content.len() + 1024);
    let _ = write!(
        prompt,
        "Analyze this Next.js API route file and extract OpenAPI information.\n\n\
         File: {path}\n\
         File Type: {kind}\n\
         Content:\n\
         {content}\n\n\
         IMPORTANT: Return ONLY valid JSON with no markdown formatting, no backticks, no code blocks.\n\n\
         Return this exact JSON structure:\n\
         {TARGET_SCHEMA}\n\n\
         {RULES}\n",
        kind = unit.kind,
        content = unit.content,
    );

    let segments = dynamic_segments(&unit.route_path.to_string_lossy());
    if !segments.is_empty() {
        prompt.push_str("\nDynamic segments in this file's path:\n");
        for segment in &segments {
            let _ = writeln!(prompt, "- {} -> {}", segment.raw, segment.template());
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RouteFileKind;
    use std::path::Path;

    fn unit(path: &str, content: &str) -> RouteUnit {
        RouteUnit::new(path, RouteFileKind::Ts, content)
    }

    #[test]
    fn test_prompt_embeds_path_kind_and_source() {
        let src = "export async function GET(req) { return Response.json([]) }";
        let prompt = compose_prompt(&unit("app/api/users/route.ts", src));

        assert!(prompt.contains("File: app/api/users/route.ts"));
        assert!(prompt.contains("File Type: ts"));
        assert!(prompt.contains(src));
    }

    #[test]
    fn test_prompt_names_required_fields() {
        let prompt = compose_prompt(&unit("route.ts", ""));
        for field in ["\"path\"", "\"description\"", "\"methods\"", "\"summary\"", "\"parameters\""] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(prompt.contains("Only include methods that actually exist in the code"));
    }

    #[test]
    fn test_prompt_instructs_single_segment_conversion() {
        let prompt = compose_prompt(&unit("app/api/users/[id]/route.ts", ""));
        assert!(prompt.contains("Convert [id] to {id}"));
        assert!(prompt.contains("- [id] -> {id}"));
    }

    #[test]
    fn test_prompt_instructs_catch_all_conversion() {
        let prompt = compose_prompt(&unit("app/api/docs/[...slug]/route.ts", ""));
        assert!(prompt.contains("Convert [...slug] to {slug}"));
        assert!(prompt.contains("- [...slug] -> {slug}"));
    }

    #[test]
    fn test_prompt_without_dynamic_segments_has_no_segment_list() {
        let prompt = compose_prompt(&unit("app/api/health/route.ts", ""));
        assert!(!prompt.contains("Dynamic segments in this file's path"));
    }

    #[test]
    fn test_dynamic_segments_extraction() {
        let segments = dynamic_segments("app/api/[org]/repos/[...path]/x/[[...rest]]/route.ts");
        assert_eq!(segments.len(), 3);

        assert_eq!(segments[0].raw, "[org]");
        assert_eq!(segments[0].template(), "{org}");
        assert!(!segments[0].catch_all);

        assert_eq!(segments[1].raw, "[...path]");
        assert_eq!(segments[1].template(), "{path}");
        assert!(segments[1].catch_all);

        assert_eq!(segments[2].raw, "[[...rest]]");
        assert_eq!(segments[2].template(), "{rest}");
        assert!(segments[2].catch_all);
    }

    #[test]
    fn test_brackets_above_the_api_root_are_not_segments() {
        let u = RouteUnit::new("/home/me/[work]/shop/app/api/health/route.ts", RouteFileKind::Ts, "")
            .relative_to(Path::new("/home/me/[work]/shop/app/api"));
        let prompt = compose_prompt(&u);
        assert!(prompt.contains("File: /home/me/[work]/shop/app/api/health/route.ts"));
        assert!(!prompt.contains("- [work] -> {work}"));
        assert!(!prompt.contains("Dynamic segments in this file's path"));
    }

    #[test]
    fn test_segments_below_the_api_root_are_listed() {
        let u = RouteUnit::new("/srv/[env]/api/users/[id]/route.ts", RouteFileKind::Ts, "")
            .relative_to(Path::new("/srv/[env]/api"));
        let prompt = compose_prompt(&u);
        assert!(prompt.contains("- [id] -> {id}"));
        assert!(!prompt.contains("- [env] -> {env}"));
    }

    #[test]
    fn test_compose_is_pure() {
        let u = unit("app/api/users/[id]/route.ts", "export function GET() {}");
        assert_eq!(compose_prompt(&u), compose_prompt(&u));
    }
}
