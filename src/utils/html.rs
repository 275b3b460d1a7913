use scraper::{ElementRef, Html, Selector};

// base
pub trait DOMProcessor<T>: Sync + Send {
    fn process(&self, el: &ElementRef) -> T;
}

/// Parses `html` as a full document and runs `processor` from its root.
pub fn process_document<T>(html: &str, processor: &dyn DOMProcessor<T>) -> T {
    let document = Html::parse_document(html);
    let root = document.root_element();

    processor.process(&root)
}

// text nodes
#[derive(Default)]
pub struct TextValue {
    pub all_nodes: bool,
    pub trim: bool,
}

impl DOMProcessor<String> for TextValue {
    fn process(&self, el: &ElementRef) -> String {
        let text: String = if self.all_nodes {
            el.text().collect()
        } else {
            el.text().next().unwrap_or_default().into()
        };

        if self.trim {
            text.trim().into()
        } else {
            text
        }
    }
}

impl From<TextValue> for Box<dyn DOMProcessor<String>> {
    fn from(value: TextValue) -> Self {
        Box::new(value)
    }
}

impl TextValue {
    pub fn new() -> TextValue {
        TextValue::default()
    }

    pub fn all_nodes(mut self) -> Self {
        self.all_nodes = true;
        self
    }

    pub fn trimmed(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn in_scope(self, selectors: &str) -> ScopeProcessor<String> {
        ScopeProcessor::new(selectors, self.into())
    }
}

pub struct AttrValue {
    pub attr: &'static str,
}

impl DOMProcessor<String> for AttrValue {
    fn process(&self, el: &ElementRef) -> String {
        el.attr(self.attr).map(|s| s.into()).unwrap_or_default()
    }
}

impl From<AttrValue> for Box<dyn DOMProcessor<String>> {
    fn from(value: AttrValue) -> Self {
        Box::new(value)
    }
}

impl AttrValue {
    pub fn new(attr: &'static str) -> AttrValue {
        AttrValue { attr }
    }

    pub fn in_scope(self, selectors: &str) -> ScopeProcessor<String> {
        ScopeProcessor::new(selectors, self.into())
    }

    pub fn itr_scope(self, selectors: &str) -> ItemsProcessor<String> {
        ItemsProcessor::new(selectors, self.into())
    }
}

// transformation

pub struct MapValue<In, Out> {
    pub map: Box<dyn Fn(In) -> Out + Sync + Send>,
    pub sub_processor: Box<dyn DOMProcessor<In>>,
}

impl<In, Out> DOMProcessor<Out> for MapValue<In, Out> {
    fn process(&self, el: &ElementRef) -> Out {
        let input = self.sub_processor.process(el);
        (self.map)(input)
    }
}

impl<In: 'static, Out: 'static> From<MapValue<In, Out>> for Box<dyn DOMProcessor<Out>> {
    fn from(value: MapValue<In, Out>) -> Self {
        Box::new(value)
    }
}

impl<In, Out> MapValue<In, Out> {
    pub fn new<Map>(map: Map, sub_processor: Box<dyn DOMProcessor<In>>) -> MapValue<In, Out>
    where
        Map: Fn(In) -> Out + 'static + Sync + Send,
    {
        MapValue {
            map: Box::new(map),
            sub_processor,
        }
    }
}

// lists
pub struct ItemsProcessor<Item> {
    pub scope: Selector,
    pub item_processor: Box<dyn DOMProcessor<Item>>,
}

impl<Item> DOMProcessor<Vec<Item>> for ItemsProcessor<Item> {
    fn process(&self, el: &ElementRef) -> Vec<Item> {
        el.select(&self.scope)
            .map(|e| self.item_processor.process(&e))
            .collect()
    }
}

impl<Item: 'static> From<ItemsProcessor<Item>> for Box<dyn DOMProcessor<Vec<Item>>> {
    fn from(value: ItemsProcessor<Item>) -> Self {
        Box::new(value)
    }
}

impl<Item> ItemsProcessor<Item> {
    pub fn new(scope: &str, item_processor: Box<dyn DOMProcessor<Item>>) -> ItemsProcessor<Item> {
        ItemsProcessor {
            scope: Selector::parse(scope).unwrap(),
            item_processor,
        }
    }
}

impl<Item: 'static> ItemsProcessor<Item> {
    pub fn map<Map, Out>(self, map: Map) -> MapValue<Vec<Item>, Out>
    where
        Map: Fn(Vec<Item>) -> Out + 'static + Sync + Send,
    {
        MapValue::new(map, self.into())
    }
}

// scope

/// First element matching `scope`, if any.
pub struct ScopeProcessor<Item> {
    pub scope: Selector,
    pub item_processor: Box<dyn DOMProcessor<Item>>,
}

impl<Item> DOMProcessor<Option<Item>> for ScopeProcessor<Item> {
    fn process(&self, el: &ElementRef) -> Option<Item> {
        el.select(&self.scope)
            .map(|e| self.item_processor.process(&e))
            .next()
    }
}

impl<Item: 'static> From<ScopeProcessor<Item>> for Box<dyn DOMProcessor<Option<Item>>> {
    fn from(value: ScopeProcessor<Item>) -> Self {
        Box::new(value)
    }
}

impl<Item> ScopeProcessor<Item> {
    pub fn new(scope: &str, item_processor: Box<dyn DOMProcessor<Item>>) -> ScopeProcessor<Item> {
        ScopeProcessor {
            scope: Selector::parse(scope).unwrap(),
            item_processor,
        }
    }
}

impl<Item: 'static> ScopeProcessor<Item> {
    pub fn map_optional<Map, Out>(self, map: Map) -> MapValue<Option<Item>, Option<Out>>
    where
        Map: Fn(Item) -> Option<Out> + 'static + Sync + Send,
    {
        MapValue::new(move |opt: Option<Item>| opt.and_then(&map), self.into())
    }
}

/// Attribute of the first element matching `selectors`, empty values dropped.
pub fn non_empty_attr(selectors: &str, attr: &'static str) -> Box<dyn DOMProcessor<Option<String>>> {
    AttrValue::new(attr)
        .in_scope(selectors)
        .map_optional(|v: String| {
            let v = v.trim().to_owned();
            (!v.is_empty()).then_some(v)
        })
        .into()
}
