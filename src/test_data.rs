pub const POST_DATA: &str = "---
title: What I learned after 20+ years of software development
date: 2022-04-02 12:05:00
categories: [Career]
tags: [engineering, advice]
draft: false
---

How to be a great software engineer?

Someone asked me this question today and I didn’t have an answer. After thinking for a while, I came up with a list of what I try to do myself.

<!-- more -->

## Non technical

### Have a honest image of yourself
";

pub const SITE_CONFIG: &str = "# Site
title: My Blog
author: someone

# Category slugs used in URLs
category_map:
  Tech: tech
  # personal stuff
  Life: life

# Writing
per_page: 10
";

pub fn post_text(title: &str, date: &str, categories: &str, draft: bool) -> String {
    format!(
        "---\ntitle: {}\ndate: {}\ncategories: {}\ntags: []\ndraft: {}\n---\n\nbody of {}\n",
        title, date, categories, draft, title
    )
}
