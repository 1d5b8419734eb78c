//! Platform predicates
//!
//! The compiler core knows nothing about which tags exist. Tag tables come
//! from a [`Platform`], and [`WebPlatform`] provides the HTML/SVG ones.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Tag and attribute knowledge supplied by the target platform.
///
/// Every predicate defaults to "no", so a platform only overrides what it
/// knows about.
pub trait Platform: Send + Sync {
	/// Tags that are platform native rather than components.
	fn is_reserved_tag(&self, _tag: &str) -> bool {
		false
	}

	/// Tags that never have content (`<br>`).
	fn is_unary_tag(&self, _tag: &str) -> bool {
		false
	}

	/// Tags whose end tag may be omitted (`<li>`, `<p>`).
	fn can_be_left_open_tag(&self, _tag: &str) -> bool {
		false
	}

	/// Tags that implicitly close an open `<p>`.
	fn is_non_phrasing_tag(&self, _tag: &str) -> bool {
		false
	}

	/// Tags whose whitespace is significant.
	fn is_pre_tag(&self, _tag: &str) -> bool {
		false
	}

	/// Bindings that must be set as DOM properties instead of attributes.
	fn must_use_prop(&self, _tag: &str, _type_attr: Option<&str>, _attr: &str) -> bool {
		false
	}

	fn tag_namespace(&self, _tag: &str) -> Option<&'static str> {
		None
	}
}

/// Framework pseudo elements.
pub fn is_built_in_tag(tag: &str) -> bool {
	matches!(tag, "slot" | "component")
}

/// Elements whose content is scanned as raw text.
pub fn is_plain_text_element(tag: &str) -> bool {
	matches!(tag, "script" | "style" | "textarea")
}

fn tag_set(tags: &'static str) -> HashSet<&'static str> {
	tags.split(',').collect()
}

static HTML_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
	tag_set(
		"html,body,base,head,link,meta,style,title,\
		address,article,aside,footer,header,h1,h2,h3,h4,h5,h6,hgroup,nav,section,\
		div,dd,dl,dt,figcaption,figure,picture,hr,img,li,main,ol,p,pre,ul,\
		a,b,abbr,bdi,bdo,br,cite,code,data,dfn,em,i,kbd,mark,q,rp,rt,rtc,ruby,\
		s,samp,small,span,strong,sub,sup,time,u,var,wbr,area,audio,map,track,video,\
		embed,object,param,source,canvas,script,noscript,del,ins,\
		caption,col,colgroup,table,thead,tbody,td,th,tr,\
		button,datalist,fieldset,form,input,label,legend,meter,optgroup,option,\
		output,progress,select,textarea,\
		details,dialog,menu,menuitem,summary,\
		content,element,shadow,template,blockquote,iframe,tfoot",
	)
});

static SVG_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
	tag_set(
		"svg,animate,circle,clippath,cursor,defs,desc,ellipse,filter,font-face,\
		foreignObject,g,glyph,image,line,marker,mask,missing-glyph,path,pattern,\
		polygon,polyline,rect,switch,symbol,text,textpath,tspan,use,view",
	)
});

static UNARY_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
	tag_set("area,base,br,col,embed,frame,hr,img,input,isindex,keygen,link,meta,param,source,track,wbr")
});

static LEFT_OPEN_TAGS: LazyLock<HashSet<&'static str>> =
	LazyLock::new(|| tag_set("colgroup,dd,dt,li,options,p,td,tfoot,th,thead,tr,source"));

static NON_PHRASING_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
	tag_set(
		"address,article,aside,base,blockquote,body,caption,col,colgroup,dd,\
		details,dialog,div,dl,dt,fieldset,figcaption,figure,footer,form,\
		h1,h2,h3,h4,h5,h6,head,header,hgroup,hr,html,legend,li,menuitem,meta,\
		optgroup,option,param,rp,rt,source,style,summary,tbody,td,tfoot,th,thead,\
		title,tr,track",
	)
});

/// HTML and SVG tag tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebPlatform;

impl WebPlatform {
	pub fn is_html_tag(tag: &str) -> bool {
		HTML_TAGS.contains(tag)
	}

	pub fn is_svg(tag: &str) -> bool {
		SVG_TAGS.contains(tag)
	}
}

impl Platform for WebPlatform {
	fn is_reserved_tag(&self, tag: &str) -> bool {
		Self::is_html_tag(tag) || Self::is_svg(tag)
	}

	fn is_unary_tag(&self, tag: &str) -> bool {
		UNARY_TAGS.contains(tag)
	}

	fn can_be_left_open_tag(&self, tag: &str) -> bool {
		LEFT_OPEN_TAGS.contains(tag)
	}

	fn is_non_phrasing_tag(&self, tag: &str) -> bool {
		NON_PHRASING_TAGS.contains(tag)
	}

	fn is_pre_tag(&self, tag: &str) -> bool {
		tag == "pre"
	}

	fn must_use_prop(&self, tag: &str, type_attr: Option<&str>, attr: &str) -> bool {
		let accepts_value = matches!(tag, "input" | "textarea" | "option" | "select" | "progress");
		(attr == "value" && accepts_value && type_attr != Some("button"))
			|| (attr == "selected" && tag == "option")
			|| (attr == "checked" && tag == "input")
			|| (attr == "muted" && tag == "video")
	}

	fn tag_namespace(&self, tag: &str) -> Option<&'static str> {
		if Self::is_svg(tag) {
			Some("svg")
		} else if tag == "math" {
			Some("math")
		} else {
			None
		}
	}
}
